use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{ContextFlags, SerializationContext, WireName};

/// A named group of context settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// [`SerializationContext::set_concise`].
    Concise,
    /// [`SerializationContext::set_verbose`].
    Verbose,
    /// [`SerializationContext::set_full_names`] only.
    FullNames,
    /// [`SerializationContext::set_short_names`] only.
    ShortNames,
}

/// Context configuration loadable from a configuration file.
///
/// Applied in order: the presets, then the names, then the flags.
/// Absent entries leave the context untouched, so they keep inheriting
/// from its parent.
///
/// # Examples
///
/// ```
/// use wv_reflect::serial::{ContextSettings, SerializationContext};
///
/// let settings: ContextSettings = ron::from_str(
///     r#"(
///         presets: [verbose],
///         names: { root_element: "Document" },
///         remove_null_values: Some(true),
///     )"#,
/// )
/// .unwrap();
///
/// let ctx = SerializationContext::new();
/// settings.apply(&ctx);
///
/// assert_eq!(&*ctx.root_element_name(), "Document");
/// assert!(ctx.verbose_types());
/// assert!(ctx.remove_null_values());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub presets: Vec<Preset>,
    pub names: BTreeMap<WireName, String>,
    pub fix_field_names: Option<bool>,
    pub remove_null_values: Option<bool>,
    pub explicit_array_elements: Option<bool>,
    pub array_elements_include_indices: Option<bool>,
    pub duplicate_strings_can_be_referred_to: Option<bool>,
    pub verbose_types: Option<bool>,
}

impl ContextSettings {
    /// Writes the settings onto `ctx` as local overrides.
    pub fn apply(&self, ctx: &SerializationContext) {
        for preset in &self.presets {
            match preset {
                Preset::Concise => ctx.set_concise(),
                Preset::Verbose => ctx.set_verbose(),
                Preset::FullNames => ctx.set_full_names(),
                Preset::ShortNames => ctx.set_short_names(),
            }
        }
        for (key, name) in &self.names {
            ctx.set_name(*key, name.as_str());
        }

        let flags = [
            (ContextFlags::FIX_FIELD_NAMES, self.fix_field_names),
            (ContextFlags::REMOVE_NULL_VALUES, self.remove_null_values),
            (ContextFlags::EXPLICIT_ARRAY_ELEMENTS, self.explicit_array_elements),
            (
                ContextFlags::ARRAY_ELEMENTS_INCLUDE_INDICES,
                self.array_elements_include_indices,
            ),
            (
                ContextFlags::DUPLICATE_STRINGS_CAN_BE_REFERRED_TO,
                self.duplicate_strings_can_be_referred_to,
            ),
            (ContextFlags::VERBOSE_TYPES, self.verbose_types),
        ];
        for (flag, on) in flags {
            if let Some(on) = on {
                ctx.set_flag(flag, on);
            }
        }
    }

    /// Creates a child of the global context with these settings applied.
    pub fn to_context(&self) -> SerializationContext {
        let ctx = SerializationContext::new();
        self.apply(&ctx);
        ctx
    }
}
