use alloc::sync::Arc;
use alloc::vec::Vec;

// -----------------------------------------------------------------------------
// VariantInfo

/// A named enum value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantInfo {
    name: Arc<str>,
    value: i64,
}

impl VariantInfo {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }
}

// -----------------------------------------------------------------------------
// EnumInfo

/// Declaration of an enum type with integer discriminants.
///
/// Enum values are carried as [`Value::Enum`](crate::value::Value::Enum) bits,
/// so values outside the declared variants stay representable.
///
/// # Examples
///
/// ```
/// use wv_reflect::info::EnumInfo;
///
/// let info = EnumInfo::new("io::Access")
///     .flags()
///     .with_variant("Read", 1)
///     .with_variant("Write", 2);
///
/// assert!(info.is_flags());
/// assert_eq!(info.value_of("Write"), Some(2));
/// assert_eq!(info.name_of(1), Some("Read"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumInfo {
    path: Arc<str>,
    variants: Vec<VariantInfo>,
    flags: bool,
}

impl EnumInfo {
    /// Creates a declaration for the enum at `path`.
    #[inline]
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self {
            path: path.into(),
            variants: Vec::new(),
            flags: false,
        }
    }

    /// Appends a variant.
    #[inline]
    pub fn with_variant(mut self, name: impl Into<Arc<str>>, value: i64) -> Self {
        self.variants.push(VariantInfo {
            name: name.into(),
            value,
        });
        self
    }

    /// Gives the enum bit-flag semantics.
    #[inline]
    pub fn flags(mut self) -> Self {
        self.flags = true;
        self
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn path_arc(&self) -> &Arc<str> {
        &self.path
    }

    #[inline]
    pub fn variants(&self) -> &[VariantInfo] {
        &self.variants
    }

    #[inline]
    pub fn is_flags(&self) -> bool {
        self.flags
    }

    /// Returns the value of the variant named `name`.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.variants
            .iter()
            .find(|v| &*v.name == name)
            .map(|v| v.value)
    }

    /// Returns the name of the first variant whose value is `value`.
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.variants
            .iter()
            .find(|v| v.value == value)
            .map(VariantInfo::name)
    }
}
