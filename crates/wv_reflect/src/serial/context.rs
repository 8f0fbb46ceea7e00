use alloc::sync::Arc;
use std::sync::{LazyLock, RwLock};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use wv_utils::hash::HashMap;
use wv_utils::sync;

use super::{ArgumentError, FieldRenamer, Surrogate, SurrogateChain};
use crate::info::{ParseTyError, Ty};

// -----------------------------------------------------------------------------
// ContextFlags

bitflags! {
    /// Boolean policies of a [`SerializationContext`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContextFlags: u32 {
        /// Rename `m_value` fields to `Value`.
        const FIX_FIELD_NAMES = 1 << 0;
        /// Omit null elements of explicit arrays.
        const REMOVE_NULL_VALUES = 1 << 1;
        /// Write one node per array element, even for primitives and strings.
        const EXPLICIT_ARRAY_ELEMENTS = 1 << 2;
        /// Write the index attribute on every explicit array element.
        const ARRAY_ELEMENTS_INCLUDE_INDICES = 1 << 3;
        /// Track string identity so a repeated string becomes a back-reference.
        const DUPLICATE_STRINGS_CAN_BE_REFERRED_TO = 1 << 4;
        /// Tag every node with its runtime type, not only on mismatch.
        const VERBOSE_TYPES = 1 << 5;
    }
}

impl ContextFlags {
    /// The policies of [`SerializationContext::set_concise`].
    pub const CONCISE: Self = Self::FIX_FIELD_NAMES
        .union(Self::REMOVE_NULL_VALUES)
        .union(Self::DUPLICATE_STRINGS_CAN_BE_REFERRED_TO);

    /// The policies of [`SerializationContext::set_verbose`].
    pub const VERBOSE: Self = Self::FIX_FIELD_NAMES
        .union(Self::EXPLICIT_ARRAY_ELEMENTS)
        .union(Self::ARRAY_ELEMENTS_INCLUDE_INDICES)
        .union(Self::VERBOSE_TYPES);
}

// -----------------------------------------------------------------------------
// WireName

/// A configurable attribute or node name of the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireName {
    TypeAttribute,
    NullAttribute,
    NullValue,
    RootElement,
    ArrayAttribute,
    ArrayElement,
    ArrayIndexAttribute,
    ArrayLowerBoundAttribute,
    ReferenceIdAttribute,
    ReferToAttribute,
}

impl WireName {
    pub const ALL: [WireName; 10] = [
        WireName::TypeAttribute,
        WireName::NullAttribute,
        WireName::NullValue,
        WireName::RootElement,
        WireName::ArrayAttribute,
        WireName::ArrayElement,
        WireName::ArrayIndexAttribute,
        WireName::ArrayLowerBoundAttribute,
        WireName::ReferenceIdAttribute,
        WireName::ReferToAttribute,
    ];

    /// The name used by [`SerializationContext::set_full_names`].
    pub const fn full(self) -> &'static str {
        match self {
            WireName::TypeAttribute => "_Type",
            WireName::NullAttribute => "_Null",
            WireName::NullValue => "1",
            WireName::RootElement => "_Root",
            WireName::ArrayAttribute => "_Array",
            WireName::ArrayElement => "_Element",
            WireName::ArrayIndexAttribute => "_Index",
            WireName::ArrayLowerBoundAttribute => "_LowerBound",
            WireName::ReferenceIdAttribute => "_RefID",
            WireName::ReferToAttribute => "_ReferTo",
        }
    }

    /// The name used by [`SerializationContext::set_short_names`].
    pub const fn short(self) -> &'static str {
        match self {
            WireName::TypeAttribute => "_T",
            WireName::NullAttribute => "_N",
            WireName::NullValue => "1",
            WireName::RootElement => "_R",
            WireName::ArrayAttribute => "_A",
            WireName::ArrayElement => "_",
            WireName::ArrayIndexAttribute => "_I",
            WireName::ArrayLowerBoundAttribute => "_L",
            WireName::ReferenceIdAttribute => "_ID",
            WireName::ReferToAttribute => "_RID",
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

/// A snapshot of every [`WireName`] of a context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireNames {
    pub type_attribute: Arc<str>,
    pub null_attribute: Arc<str>,
    pub null_value: Arc<str>,
    pub root_element: Arc<str>,
    pub array_attribute: Arc<str>,
    pub array_element: Arc<str>,
    pub array_index_attribute: Arc<str>,
    pub array_lower_bound_attribute: Arc<str>,
    pub reference_id_attribute: Arc<str>,
    pub refer_to_attribute: Arc<str>,
}

// -----------------------------------------------------------------------------
// SerializationContext

#[derive(Default)]
struct ContextState {
    names: [Option<Arc<str>>; WireName::ALL.len()],
    // `overridden` marks which bits of `flags` are set locally.
    flags: ContextFlags,
    overridden: ContextFlags,
    renamer: Option<Arc<dyn FieldRenamer>>,
    surrogates: HashMap<Ty, SurrogateChain>,
}

struct ContextInner {
    parent: Option<SerializationContext>,
    state: RwLock<ContextState>,
}

static GLOBAL: LazyLock<SerializationContext> = LazyLock::new(|| {
    let root = SerializationContext {
        inner: Arc::new(ContextInner {
            parent: None,
            state: RwLock::new(ContextState::default()),
        }),
    };
    root.set_full_names();
    {
        let mut state = sync::write(&root.inner.state);
        state.flags = ContextFlags::CONCISE;
        state.overridden = ContextFlags::all();
    }
    root
});

/// The configuration of a serialization session.
///
/// A context holds the wire names, the policy flags, an optional field
/// renamer and a table of external surrogates. Every setting not set on a
/// context is read from its parent, up to the process-wide
/// [`global`](Self::global) context. Reads are live: changing a parent is
/// visible through every child that did not set the same setting.
///
/// The handle is cheap to clone, clones share the same settings.
/// Contexts are configuration: changing one while a session reads it
/// gives unspecified, but memory-safe, results.
///
/// # Examples
///
/// ```
/// use wv_reflect::serial::SerializationContext;
///
/// let parent = SerializationContext::new();
/// let child = SerializationContext::with_parent(&parent);
///
/// parent.set_root_element_name("Data");
/// assert_eq!(&*child.root_element_name(), "Data");
///
/// child.set_root_element_name("Item");
/// assert_eq!(&*parent.root_element_name(), "Data");
///
/// assert!(!child.verbose_types());
/// parent.set_verbose_types(true);
/// assert!(child.verbose_types());
/// ```
#[derive(Clone)]
pub struct SerializationContext {
    inner: Arc<ContextInner>,
}

impl Default for SerializationContext {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! impl_name_accessors {
    ($($key:ident, $get:ident, $set:ident;)*) => {
        impl SerializationContext {
            $(
                #[doc = concat!("Returns the [`WireName::", stringify!($key), "`] in effect.")]
                #[inline]
                pub fn $get(&self) -> Arc<str> {
                    self.name(WireName::$key)
                }

                #[doc = concat!("Overrides the [`WireName::", stringify!($key), "`] on this context.")]
                #[inline]
                pub fn $set(&self, name: impl Into<Arc<str>>) {
                    self.set_name(WireName::$key, name);
                }
            )*
        }
    };
}

impl_name_accessors! {
    TypeAttribute, type_attribute_name, set_type_attribute_name;
    NullAttribute, null_attribute_name, set_null_attribute_name;
    NullValue, null_attribute_value, set_null_attribute_value;
    RootElement, root_element_name, set_root_element_name;
    ArrayAttribute, array_attribute_name, set_array_attribute_name;
    ArrayElement, array_element_name, set_array_element_name;
    ArrayIndexAttribute, array_index_attribute_name, set_array_index_attribute_name;
    ArrayLowerBoundAttribute, array_lower_bound_attribute_name, set_array_lower_bound_attribute_name;
    ReferenceIdAttribute, reference_id_attribute_name, set_reference_id_attribute_name;
    ReferToAttribute, refer_to_attribute_name, set_refer_to_attribute_name;
}

macro_rules! impl_flag_accessors {
    ($($flag:ident, $get:ident, $set:ident;)*) => {
        impl SerializationContext {
            $(
                #[doc = concat!("Returns whether [`ContextFlags::", stringify!($flag), "`] is in effect.")]
                #[inline]
                pub fn $get(&self) -> bool {
                    self.flag(ContextFlags::$flag)
                }

                #[doc = concat!("Sets [`ContextFlags::", stringify!($flag), "`] on this context.")]
                #[inline]
                pub fn $set(&self, on: bool) {
                    self.set_flag(ContextFlags::$flag, on);
                }
            )*
        }
    };
}

impl_flag_accessors! {
    FIX_FIELD_NAMES, fix_field_names, set_fix_field_names;
    REMOVE_NULL_VALUES, remove_null_values, set_remove_null_values;
    EXPLICIT_ARRAY_ELEMENTS, all_arrays_have_explicit_elements, set_all_arrays_have_explicit_elements;
    ARRAY_ELEMENTS_INCLUDE_INDICES, array_elements_include_indices, set_array_elements_include_indices;
    DUPLICATE_STRINGS_CAN_BE_REFERRED_TO, duplicate_strings_can_be_referred_to, set_duplicate_strings_can_be_referred_to;
    VERBOSE_TYPES, verbose_types, set_verbose_types;
}

impl SerializationContext {
    /// Creates a context inheriting everything from the [`global`](Self::global) one.
    #[inline]
    pub fn new() -> Self {
        Self::with_parent(Self::global())
    }

    /// Creates a context inheriting everything from `parent`.
    pub fn with_parent(parent: &SerializationContext) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                parent: Some(parent.clone()),
                state: RwLock::new(ContextState::default()),
            }),
        }
    }

    /// The process-wide default context: full names and concise policies.
    #[inline]
    pub fn global() -> &'static SerializationContext {
        &GLOBAL
    }

    #[inline]
    pub fn parent(&self) -> Option<&SerializationContext> {
        self.inner.parent.as_ref()
    }

    /// Returns `true` if both handles share the same settings.
    #[inline]
    pub fn ptr_eq(&self, other: &SerializationContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // Self first, then each parent.
    fn chain(&self) -> impl Iterator<Item = &SerializationContext> {
        core::iter::successors(Some(self), |ctx| ctx.inner.parent.as_ref())
    }

    // -------------------------------------------------------------------------
    // Names

    /// Returns the wire name in effect for `key`.
    pub fn name(&self, key: WireName) -> Arc<str> {
        for ctx in self.chain() {
            if let Some(name) = &sync::read(&ctx.inner.state).names[key.index()] {
                return name.clone();
            }
        }
        Arc::from(key.full())
    }

    /// Overrides the wire name for `key` on this context.
    #[inline]
    pub fn set_name(&self, key: WireName, name: impl Into<Arc<str>>) {
        sync::write(&self.inner.state).names[key.index()] = Some(name.into());
    }

    /// Removes the local override of `key`. Ignored on the global context.
    pub fn clear_name(&self, key: WireName) {
        if self.inner.parent.is_some() {
            sync::write(&self.inner.state).names[key.index()] = None;
        }
    }

    /// Snapshots every wire name in effect.
    pub fn wire_names(&self) -> WireNames {
        WireNames {
            type_attribute: self.name(WireName::TypeAttribute),
            null_attribute: self.name(WireName::NullAttribute),
            null_value: self.name(WireName::NullValue),
            root_element: self.name(WireName::RootElement),
            array_attribute: self.name(WireName::ArrayAttribute),
            array_element: self.name(WireName::ArrayElement),
            array_index_attribute: self.name(WireName::ArrayIndexAttribute),
            array_lower_bound_attribute: self.name(WireName::ArrayLowerBoundAttribute),
            reference_id_attribute: self.name(WireName::ReferenceIdAttribute),
            refer_to_attribute: self.name(WireName::ReferToAttribute),
        }
    }

    /// Sets the `_Root _Type _Null _RefID _ReferTo _Array _Element _Index _LowerBound` names.
    pub fn set_full_names(&self) {
        let mut state = sync::write(&self.inner.state);
        for key in WireName::ALL {
            state.names[key.index()] = Some(Arc::from(key.full()));
        }
    }

    /// Sets the `_R _T _N _ID _RID _A _ _I _L` names.
    pub fn set_short_names(&self) {
        let mut state = sync::write(&self.inner.state);
        for key in WireName::ALL {
            state.names[key.index()] = Some(Arc::from(key.short()));
        }
    }

    // -------------------------------------------------------------------------
    // Flags

    /// Returns whether every bit of `flag` is in effect.
    pub fn flag(&self, flag: ContextFlags) -> bool {
        flag.iter().all(|bit| self.single_flag(bit))
    }

    fn single_flag(&self, bit: ContextFlags) -> bool {
        for ctx in self.chain() {
            let state = sync::read(&ctx.inner.state);
            if state.overridden.contains(bit) || ctx.inner.parent.is_none() {
                return state.flags.contains(bit);
            }
        }
        false
    }

    /// Returns every flag in effect.
    pub fn flags(&self) -> ContextFlags {
        ContextFlags::all()
            .iter()
            .filter(|bit| self.single_flag(*bit))
            .collect()
    }

    /// Overrides every bit of `flag` on this context.
    pub fn set_flag(&self, flag: ContextFlags, on: bool) {
        let mut state = sync::write(&self.inner.state);
        state.flags.set(flag, on);
        state.overridden.insert(flag);
    }

    /// Removes the local override of `flag`. Ignored on the global context.
    pub fn clear_flag(&self, flag: ContextFlags) {
        if self.inner.parent.is_none() {
            return;
        }
        let mut state = sync::write(&self.inner.state);
        state.flags.remove(flag);
        state.overridden.remove(flag);
    }

    /// Overrides every flag at once: the bits of `flags` on, all others off.
    pub fn set_flags(&self, flags: ContextFlags) {
        let mut state = sync::write(&self.inner.state);
        state.flags = flags;
        state.overridden = ContextFlags::all();
    }

    // -------------------------------------------------------------------------
    // Presets

    /// Short names and [`ContextFlags::CONCISE`] policies.
    pub fn set_concise(&self) {
        self.set_short_names();
        self.set_flags(ContextFlags::CONCISE);
    }

    /// Full names and [`ContextFlags::VERBOSE`] policies.
    pub fn set_verbose(&self) {
        self.set_full_names();
        self.set_flags(ContextFlags::VERBOSE);
    }

    // -------------------------------------------------------------------------
    // Field renamer

    /// Returns the field renamer in effect.
    pub fn field_renamer(&self) -> Option<Arc<dyn FieldRenamer>> {
        self.chain()
            .find_map(|ctx| sync::read(&ctx.inner.state).renamer.clone())
    }

    /// Installs a field renamer on this context.
    #[inline]
    pub fn set_field_renamer(&self, renamer: Arc<dyn FieldRenamer>) {
        sync::write(&self.inner.state).renamer = Some(renamer);
    }

    /// Removes the local field renamer, returning it.
    #[inline]
    pub fn clear_field_renamer(&self) -> Option<Arc<dyn FieldRenamer>> {
        sync::write(&self.inner.state).renamer.take()
    }

    // -------------------------------------------------------------------------
    // Surrogates

    /// Registers an external surrogate for the exact type `ty`.
    ///
    /// A surrogate already registered for `ty` on this context is kept,
    /// the new one is appended and runs after it.
    pub fn register_surrogate(&self, ty: Ty, surrogate: Arc<dyn Surrogate>) {
        log::debug!("registering surrogate for `{ty}`");
        sync::write(&self.inner.state)
            .surrogates
            .entry(ty)
            .or_default()
            .push(surrogate);
    }

    /// Returns the surrogates of the nearest context in the chain that has any for `ty`.
    ///
    /// Surrogates registered for base types are not considered.
    pub fn surrogate(&self, ty: &Ty) -> Option<SurrogateChain> {
        self.chain()
            .find_map(|ctx| sync::read(&ctx.inner.state).surrogates.get(ty).cloned())
    }

    /// Removes the surrogates registered for `ty` on this context only.
    #[inline]
    pub fn remove_surrogate(&self, ty: &Ty) -> Option<SurrogateChain> {
        sync::write(&self.inner.state).surrogates.remove(ty)
    }

    /// [`register_surrogate`](Self::register_surrogate) by type name.
    pub fn register_surrogate_by_path(
        &self,
        path: &str,
        surrogate: Arc<dyn Surrogate>,
    ) -> Result<(), ArgumentError> {
        self.register_surrogate(parse_argument(path)?, surrogate);
        Ok(())
    }

    /// [`surrogate`](Self::surrogate) by type name.
    pub fn surrogate_by_path(&self, path: &str) -> Result<Option<SurrogateChain>, ArgumentError> {
        Ok(self.surrogate(&parse_argument(path)?))
    }

    /// [`remove_surrogate`](Self::remove_surrogate) by type name.
    pub fn remove_surrogate_by_path(
        &self,
        path: &str,
    ) -> Result<Option<SurrogateChain>, ArgumentError> {
        Ok(self.remove_surrogate(&parse_argument(path)?))
    }
}

fn parse_argument(path: &str) -> Result<Ty, ArgumentError> {
    Ty::parse(path).map_err(|e| match e {
        ParseTyError::Empty => ArgumentError::EmptyTypeName,
        _ => ArgumentError::MalformedTypeName(path.into()),
    })
}

impl core::fmt::Debug for SerializationContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerializationContext")
            .field("names", &self.wire_names())
            .field("flags", &self.flags())
            .field("global", &self.inner.parent.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::{ContextFlags, SerializationContext, WireName};
    use crate::info::Ty;
    use crate::serial::{ArgumentError, Surrogate};

    struct Nop;
    impl Surrogate for Nop {}

    #[test]
    fn global_defaults() {
        let ctx = SerializationContext::new();
        assert_eq!(&*ctx.root_element_name(), "_Root");
        assert_eq!(&*ctx.null_attribute_value(), "1");
        assert_eq!(ctx.flags(), ContextFlags::CONCISE);
        assert!(ctx.parent().unwrap().ptr_eq(SerializationContext::global()));
    }

    #[test]
    fn clear_restores_inheritance() {
        let parent = SerializationContext::new();
        let child = SerializationContext::with_parent(&parent);

        child.set_remove_null_values(false);
        parent.set_remove_null_values(true);
        assert!(!child.remove_null_values());

        child.clear_flag(ContextFlags::REMOVE_NULL_VALUES);
        assert!(child.remove_null_values());

        child.set_name(WireName::ArrayElement, "Item");
        child.clear_name(WireName::ArrayElement);
        assert_eq!(&*child.array_element_name(), "_Element");
    }

    #[test]
    fn presets() {
        let ctx = SerializationContext::new();
        ctx.set_verbose();
        assert_eq!(ctx.flags(), ContextFlags::VERBOSE);
        assert_eq!(&*ctx.type_attribute_name(), "_Type");

        ctx.set_concise();
        assert_eq!(ctx.flags(), ContextFlags::CONCISE);
        let names = ctx.wire_names();
        assert_eq!(&*names.root_element, "_R");
        assert_eq!(&*names.array_element, "_");
        assert_eq!(&*names.refer_to_attribute, "_RID");
    }

    #[test]
    fn surrogates_walk_the_chain() {
        let parent = SerializationContext::new();
        let child = SerializationContext::with_parent(&parent);

        parent.register_surrogate(Ty::I32, Arc::new(Nop));
        parent.register_surrogate(Ty::I32, Arc::new(Nop));
        assert_eq!(child.surrogate(&Ty::I32).unwrap().len(), 2);

        assert!(child.remove_surrogate(&Ty::I32).is_none());
        assert!(child.surrogate(&Ty::I32).is_some());
        assert_eq!(parent.remove_surrogate(&Ty::I32).unwrap().len(), 2);
        assert!(child.surrogate(&Ty::I32).is_none());
    }

    #[test]
    fn surrogate_paths_are_validated() {
        let ctx = SerializationContext::new();
        assert_eq!(
            ctx.register_surrogate_by_path("", Arc::new(Nop)),
            Err(ArgumentError::EmptyTypeName)
        );
        assert!(matches!(
            ctx.surrogate_by_path("List<"),
            Err(ArgumentError::MalformedTypeName(_))
        ));

        ctx.register_surrogate_by_path("demo::Point", Arc::new(Nop)).unwrap();
        assert!(ctx.surrogate(&Ty::named("demo::Point")).is_some());
        assert_eq!(ctx.remove_surrogate_by_path("demo::Point").unwrap().unwrap().len(), 1);
    }

    #[test]
    fn renamer_is_inherited() {
        let parent = SerializationContext::new();
        let child = SerializationContext::with_parent(&parent);
        assert!(child.field_renamer().is_none());

        let upper = |field: &str, _: &str| field.to_uppercase();
        parent.set_field_renamer(Arc::new(upper));
        assert_eq!(child.field_renamer().unwrap().rename("a", "T"), "A");
    }
}
