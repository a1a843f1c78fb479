use serde::{Deserialize, Deserializer};

/// One updatable attribute of a partial update.
///
/// `Missing` means the client did not mention the field at all; `Set` carries
/// whatever they sent, including an explicit `null` when `T` is an `Option`.
/// Deserialize with `#[serde(default)]` on the containing struct so absent
/// keys land on `Missing`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    #[default]
    Missing,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(v) => Some(v),
            Patch::Missing => None,
        }
    }

    /// Writes the new value into `target` when one was supplied.
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(v) = self {
            *target = v;
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(v: T) -> Self {
        Patch::Set(v)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Default)]
    #[serde(default)]
    struct Sample {
        name: Patch<String>,
        note: Patch<Option<String>>,
    }

    #[test]
    fn absent_null_and_value_are_distinct() {
        let s: Sample = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(s.name, Patch::Missing);
        assert_eq!(s.note, Patch::Missing);

        let s: Sample = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(s.note, Patch::Set(None));

        let s: Sample = serde_json::from_str(r#"{"name": "rope", "note": "frayed"}"#).unwrap();
        assert_eq!(s.name, Patch::Set("rope".to_string()));
        assert_eq!(s.note, Patch::Set(Some("frayed".to_string())));
    }

    #[test]
    fn null_on_required_field_is_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"name": null}"#).is_err());
    }

    #[test]
    fn apply_only_touches_set_fields() {
        let mut v = 3.5_f64;
        Patch::<f64>::Missing.apply_to(&mut v);
        assert_eq!(v, 3.5);
        Patch::Set(0.0).apply_to(&mut v);
        assert_eq!(v, 0.0);
    }
}
