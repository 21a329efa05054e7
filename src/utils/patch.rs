use serde::{Deserialize, Deserializer};

/// Deserializer for patch fields that can be left out, set, or cleared.
///
/// Pair it with `#[serde(default)]`: an absent field stays `None`, an
/// explicit `null` becomes `Some(None)` and a value becomes `Some(Some(v))`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
