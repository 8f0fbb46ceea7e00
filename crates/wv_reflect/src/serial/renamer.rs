use alloc::borrow::Cow;
use alloc::string::String;
use alloc::sync::Arc;

use crate::registry::FieldDescriptor;

// -----------------------------------------------------------------------------
// FieldRenamer

/// A naming policy for fields without an explicit rename.
///
/// Installed on a struct declaration (applied once, when the metadata is
/// built) or on a [`SerializationContext`](super::SerializationContext)
/// (applied on every encode and decode). Implemented for closures.
///
/// ```
/// use wv_reflect::serial::FieldRenamer;
///
/// let renamer = |field: &str, _ty: &str| format!("f_{field}");
/// assert_eq!(renamer.rename("age", "demo::Person"), "f_age");
/// ```
pub trait FieldRenamer: Send + Sync {
    /// Returns the node name for `field_name` declared on `declaring_type`.
    fn rename(&self, field_name: &str, declaring_type: &str) -> String;
}

impl<F> FieldRenamer for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    #[inline]
    fn rename(&self, field_name: &str, declaring_type: &str) -> String {
        self(field_name, declaring_type)
    }
}

// -----------------------------------------------------------------------------
// fix_field_name

/// Drops an `m_` member prefix and upper-cases the following character.
///
/// Only applies when a lowercase character follows the prefix.
///
/// ```
/// use wv_reflect::serial::fix_field_name;
///
/// assert_eq!(fix_field_name("m_age"), "Age");
/// assert_eq!(fix_field_name("m_x"), "X");
/// assert_eq!(fix_field_name("m_Name"), "m_Name");
/// assert_eq!(fix_field_name("m_"), "m_");
/// assert_eq!(fix_field_name("address"), "address");
/// ```
pub fn fix_field_name(name: &str) -> Cow<'_, str> {
    let Some(rest) = name.strip_prefix("m_") else {
        return Cow::Borrowed(name);
    };
    let mut chars = rest.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {
            let mut fixed: String = first.to_uppercase().collect();
            fixed.push_str(chars.as_str());
            Cow::Owned(fixed)
        }
        _ => Cow::Borrowed(name),
    }
}

// -----------------------------------------------------------------------------
// Built-in renamers

/// [`fix_field_name`] as a [`FieldRenamer`].
///
/// Useful on a struct declaration when the context does not set
/// [`ContextFlags::FIX_FIELD_NAMES`](super::ContextFlags::FIX_FIELD_NAMES).
#[derive(Clone, Copy, Debug, Default)]
pub struct FixMemberRenamer;

impl FieldRenamer for FixMemberRenamer {
    #[inline]
    fn rename(&self, field_name: &str, _declaring_type: &str) -> String {
        fix_field_name(field_name).into_owned()
    }
}

/// Names generated protobuf fields: drops one trailing `_` and upper-cases
/// a lowercase first character.
///
/// ```
/// use wv_reflect::serial::{FieldRenamer, ProtobufFieldRenamer};
///
/// assert_eq!(ProtobufFieldRenamer.rename("name_", "pb::Person"), "Name");
/// assert_eq!(ProtobufFieldRenamer.rename("Id", "pb::Person"), "Id");
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ProtobufFieldRenamer;

impl FieldRenamer for ProtobufFieldRenamer {
    fn rename(&self, field_name: &str, _declaring_type: &str) -> String {
        let name = field_name.strip_suffix('_').unwrap_or(field_name);
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_lowercase() => {
                let mut renamed: String = first.to_uppercase().collect();
                renamed.push_str(chars.as_str());
                renamed
            }
            _ => String::from(name),
        }
    }
}

/// The node name of `field` under a context's renaming policies.
pub(crate) fn field_node_name(
    field: &FieldDescriptor,
    renamer: Option<&dyn FieldRenamer>,
    fix: bool,
) -> Arc<str> {
    if field.has_explicit_name() {
        return field.xml_name.clone();
    }
    let renamed = match renamer {
        Some(renamer) => Arc::from(renamer.rename(field.xml_name(), field.declaring_type())),
        None => field.xml_name.clone(),
    };
    if !fix {
        return renamed;
    }
    match fix_field_name(&renamed) {
        Cow::Borrowed(_) => renamed,
        Cow::Owned(fixed) => Arc::from(fixed),
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldRenamer, FixMemberRenamer, ProtobufFieldRenamer};

    #[test]
    fn fix_member_renamer() {
        assert_eq!(FixMemberRenamer.rename("m_count", "a::T"), "Count");
        assert_eq!(FixMemberRenamer.rename("m_URL", "a::T"), "m_URL");
        assert_eq!(FixMemberRenamer.rename("", "a::T"), "");
    }

    #[test]
    fn protobuf_renamer() {
        assert_eq!(ProtobufFieldRenamer.rename("first_name_", "pb::T"), "First_name");
        assert_eq!(ProtobufFieldRenamer.rename("count", "pb::T"), "Count");
        assert_eq!(ProtobufFieldRenamer.rename("Total_", "pb::T"), "Total");
        assert_eq!(ProtobufFieldRenamer.rename("_", "pb::T"), "");
        assert_eq!(ProtobufFieldRenamer.rename("", "pb::T"), "");
    }
}
