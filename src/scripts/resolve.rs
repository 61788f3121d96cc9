//! Turn metadata values into runnable scripts

use tracing::debug;

use super::fetch::ScriptFetcher;
use super::{ScriptKind, ScriptRecord};
use crate::ScriptError;

/// Concrete kind named by the last three characters of a URL reference
pub fn kind_from_reference(reference: &str) -> Result<ScriptKind, ScriptError> {
    let suffix = reference
        .char_indices()
        .rev()
        .nth(2)
        .map(|(idx, _)| &reference[idx..])
        .unwrap_or(reference);

    ScriptKind::from_extension(suffix).ok_or_else(|| ScriptError::UnrecognizedExtension {
        path: reference.to_string(),
        suffix: suffix.to_string(),
    })
}

/// Resolve a metadata value into a [`ScriptRecord`]
///
/// Inline kinds are used as-is. A [`ScriptKind::Url`] value is downloaded
/// and the body is taken literally as a script of the kind its extension
/// names, so a downloaded body is never treated as another pointer.
pub async fn resolve(
    fetcher: &ScriptFetcher,
    raw_value: &str,
    kind: ScriptKind,
    key: &str,
) -> Result<ScriptRecord, ScriptError> {
    match kind {
        ScriptKind::Ps1 | ScriptKind::Cmd | ScriptKind::Bat => {
            Ok(ScriptRecord::new(kind, raw_value, key))
        }
        ScriptKind::Url => {
            let reference = raw_value.trim();
            let concrete = kind_from_reference(reference)?;
            debug!("{} points at a {} script: {}", key, concrete, reference);

            let body = fetcher.fetch(reference).await?;
            Ok(ScriptRecord::new(concrete, body, key))
        }
    }
}
