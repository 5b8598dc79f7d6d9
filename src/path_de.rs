use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(describe)
}

/// Same, starting from an already-parsed value.
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(describe)
}

fn describe(err: serde_path_to_error::Error<serde_json::Error>) -> String {
    let path = err.path().to_string();
    format!("at JSON path {path} → {}", err.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        inner: Inner,
    }
    #[derive(Debug, Deserialize)]
    struct Inner {
        #[allow(dead_code)]
        count: u32,
    }

    #[test]
    fn errors_name_the_path() {
        let err = from_value_with_path::<Outer>(serde_json::json!({ "inner": { "count": "x" } })).unwrap_err();
        assert!(err.starts_with("at JSON path inner.count"), "{err}");
        let err = from_str_with_path::<Outer>(r#"{"inner":{}}"#).unwrap_err();
        assert!(err.contains("missing field `count`"), "{err}");
    }
}
