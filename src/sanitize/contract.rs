//! Schema-driven sanitization of typed request contracts.
//!
//! A contract type lists its sanitizable string fields in an explicit table;
//! `sanitize_contract` rewrites each one with its profile's options.

use crate::sanitize::profile::{FieldProfile, FieldProfiles};
use crate::sanitize::text::sanitize_text;

/// A mutable view of one sanitizable field.
#[derive(Debug)]
pub struct FieldRef<'a> {
    pub name: &'static str,
    pub profile: FieldProfile,
    pub value: &'a mut String,
}

impl<'a> FieldRef<'a> {
    /// Field whose profile is inferred from its name.
    pub fn named(name: &'static str, value: &'a mut String) -> Self {
        Self {
            name,
            profile: FieldProfile::classify(name),
            value,
        }
    }

    pub fn with_profile(name: &'static str, profile: FieldProfile, value: &'a mut String) -> Self {
        Self { name, profile, value }
    }
}

/// Types whose string fields can be sanitized in place.
pub trait Sanitizable {
    fn sanitizable_fields(&mut self) -> Vec<FieldRef<'_>>;
}

/// Sanitize every listed field, returning the names of fields that changed.
pub fn sanitize_contract<T: Sanitizable + ?Sized>(
    contract: &mut T,
    profiles: &FieldProfiles,
) -> Vec<&'static str> {
    let mut changed = Vec::new();
    for field in contract.sanitizable_fields() {
        let sanitized = sanitize_text(field.value, profiles.options(field.profile));
        if sanitized != *field.value {
            *field.value = sanitized;
            changed.push(field.name);
        }
    }
    changed
}
