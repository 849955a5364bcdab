//! Typed identifiers handed back by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up URNs and provider IDs.
/// These are just strings underneath; the engine decides their format.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(Urn, "Globally unique name of a registered resource.");
typed_id!(ResourceId, "Provider-assigned ID of a custom resource.");

/// Type token of the root component every program runs under.
pub const STACK_TYPE: &str = "cairn:cairn:Stack";

impl Urn {
    /// Compose a URN the way the engine does:
    /// `urn:cairn:<stack>::<project>::<qualified type>::<name>`.
    ///
    /// The qualified type is the parent's qualified type joined with `$`,
    /// except under the root stack, whose type is never part of a child URN.
    pub fn compose(
        stack: &str,
        project: &str,
        parent: Option<&Urn>,
        type_token: &str,
        name: &str,
    ) -> Self {
        let qualified = match parent.and_then(Urn::qualified_type) {
            Some(parent_type) if parent_type != STACK_TYPE => format!("{parent_type}${type_token}"),
            _ => type_token.to_owned(),
        };
        Self(format!("urn:cairn:{stack}::{project}::{qualified}::{name}"))
    }

    fn parts(&self) -> Option<Vec<&str>> {
        let rest = self.0.strip_prefix("urn:cairn:")?;
        let parts: Vec<&str> = rest.splitn(4, "::").collect();
        (parts.len() == 4).then_some(parts)
    }

    /// Stack segment, if the URN is well formed.
    pub fn stack(&self) -> Option<&str> {
        self.parts().map(|p| p[0])
    }

    /// Project segment, if the URN is well formed.
    pub fn project(&self) -> Option<&str> {
        self.parts().map(|p| p[1])
    }

    /// Qualified type (`parent$child`), if the URN is well formed.
    pub fn qualified_type(&self) -> Option<&str> {
        self.parts().map(|p| p[2])
    }

    /// Resource type token (last segment of the qualified type).
    pub fn type_token(&self) -> Option<&str> {
        self.qualified_type()
            .and_then(|q| q.rsplit('$').next())
    }

    /// Declared resource name.
    pub fn name(&self) -> Option<&str> {
        self.parts().map(|p| p[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_top_level_skips_stack_type() {
        let stack = Urn::compose("dev", "proj", None, STACK_TYPE, "proj-dev");
        let bucket = Urn::compose("dev", "proj", Some(&stack), "aws:s3:Bucket", "logs");
        assert_eq!(bucket.as_str(), "urn:cairn:dev::proj::aws:s3:Bucket::logs");
    }

    #[test]
    fn compose_nested_joins_parent_type() {
        let parent = Urn::compose("dev", "proj", None, "my:index:Site", "site");
        let child = Urn::compose("dev", "proj", Some(&parent), "aws:s3:Bucket", "content");
        assert_eq!(child.qualified_type(), Some("my:index:Site$aws:s3:Bucket"));
        assert_eq!(child.type_token(), Some("aws:s3:Bucket"));
        assert_eq!(child.name(), Some("content"));
        assert_eq!(child.stack(), Some("dev"));
        assert_eq!(child.project(), Some("proj"));
    }

    #[test]
    fn malformed_urn_has_no_parts() {
        let urn = Urn::new("not-a-urn");
        assert_eq!(urn.name(), None);
        assert_eq!(urn.qualified_type(), None);
    }

    #[test]
    fn name_may_contain_separator() {
        let urn = Urn::new("urn:cairn:dev::proj::t:m:T::a::b");
        assert_eq!(urn.name(), Some("a::b"));
    }
}
