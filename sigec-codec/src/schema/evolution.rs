use crate::error::{Result, SchemaError};
use crate::schema::SchemaRegistry;

/// Check that `new` only appends to `old`.
///
/// Every column of `old` must keep its position, name, kind and group
/// membership in `new`, and `new` must carry a higher version. Rows written
/// under `old` then decode unchanged under `new`.
pub fn verify_append_only(old: &SchemaRegistry, new: &SchemaRegistry) -> Result<()> {
    if new.version() <= old.version() {
        return Err(SchemaError::integrity(format!(
            "schema version must increase: {} -> {}",
            old.version(),
            new.version()
        )));
    }
    if new.width() < old.width() {
        return Err(SchemaError::integrity(format!(
            "schema v{} drops columns: width {} -> {}",
            new.version(),
            old.width(),
            new.width()
        )));
    }
    for previous in old.columns() {
        let current = new.column(previous.position)?;
        if !previous.same_binding(current) {
            return Err(SchemaError::integrity(format!(
                "schema v{} rebinds position {} from '{}' to '{}'",
                new.version(),
                previous.position,
                previous.name,
                current.name
            )));
        }
    }
    if old.sentinels() != new.sentinels() {
        tracing::info!(
            from = old.version(),
            to = new.version(),
            "Boolean sentinels change between schema versions"
        );
    }
    Ok(())
}
