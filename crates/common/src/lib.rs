pub mod types;
pub mod utils;
pub mod env;
pub mod observability;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn storage_kind_label_serializes_lowercase() {
        let info = types::StorageInfo { kind: "gdrive".into() };
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["type"], "gdrive");
    }
}
