#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct ApiVersion(pub i16);

impl From<i16> for ApiVersion {
    fn from(value: i16) -> Self {
        ApiVersion(value)
    }
}

impl ApiVersion {
    pub const fn new(value: i16) -> ApiVersion {
        ApiVersion(value)
    }
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
