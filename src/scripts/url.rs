//! Cloud Storage URL matching
//!
//! Recognizes the URL shapes under which a Cloud Storage object can be
//! referenced and extracts its bucket and object name. Purely syntactic:
//! nothing here touches the network.

use regex::Regex;
use std::sync::LazyLock;

const BUCKET: &str = r"([a-z0-9][-_.a-z0-9]*)";
const OBJECT: &str = r"(.+)";

/// Shapes in match order. `gs://<bucket>/` alone has no object and never matches.
static PATTERNS: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // gs://<bucket>/<object>
        format!(r"^gs://{BUCKET}/{OBJECT}$"),
        // http(s)://<bucket>.storage.googleapis.com/<object>
        format!(r"^https?://{BUCKET}\.storage\.googleapis\.com/{OBJECT}$"),
        // http(s)://storage.cloud.google.com/<bucket>/<object>
        format!(r"^https?://storage\.cloud\.google\.com/{BUCKET}/{OBJECT}$"),
        // http(s)://storage.googleapis.com/<bucket>/<object>, plus the
        // deprecated commondatastorage.googleapis.com alias
        format!(r"^https?://(?:commondata)?storage\.googleapis\.com/{BUCKET}/{OBJECT}$"),
    ]
    .map(|pattern| Regex::new(&pattern).expect("Invalid storage URL pattern"))
});

/// A bucket/object pair extracted from a storage URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub bucket: String,
    pub object: String,
}

/// Match a reference against the known storage URL shapes
pub fn find_match(reference: &str) -> Option<StorageObject> {
    PATTERNS.iter().find_map(|re| {
        let caps = re.captures(reference)?;
        let bucket = caps.get(1)?.as_str();
        let object = caps.get(2)?.as_str();
        (!bucket.is_empty() && !object.is_empty()).then(|| StorageObject {
            bucket: bucket.to_string(),
            object: object.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(reference: &str) -> Option<(String, String)> {
        find_match(reference).map(|m| (m.bucket, m.object))
    }

    fn pair(bucket: &str, object: &str) -> Option<(String, String)> {
        Some((bucket.to_string(), object.to_string()))
    }

    #[test]
    fn test_gs_scheme() {
        assert_eq!(matched("gs://my-bucket/startup.ps1"), pair("my-bucket", "startup.ps1"));
        assert_eq!(
            matched("gs://my.bucket_1/dir/sub/run.cmd"),
            pair("my.bucket_1", "dir/sub/run.cmd")
        );
    }

    #[test]
    fn test_bucket_without_object() {
        assert_eq!(matched("gs://my-bucket"), None);
        assert_eq!(matched("gs://my-bucket/"), None);
    }

    #[test]
    fn test_virtual_host_style() {
        assert_eq!(
            matched("https://my-bucket.storage.googleapis.com/scripts/run.bat"),
            pair("my-bucket", "scripts/run.bat")
        );
        assert_eq!(
            matched("http://my-bucket.storage.googleapis.com/run.bat"),
            pair("my-bucket", "run.bat")
        );
    }

    #[test]
    fn test_storage_cloud_google_com() {
        assert_eq!(
            matched("https://storage.cloud.google.com/my-bucket/run.ps1"),
            pair("my-bucket", "run.ps1")
        );
    }

    #[test]
    fn test_path_style_and_legacy_alias() {
        assert_eq!(
            matched("https://storage.googleapis.com/my-bucket/a/b.ps1"),
            pair("my-bucket", "a/b.ps1")
        );
        assert_eq!(
            matched("http://commondatastorage.googleapis.com/my-bucket/b.cmd"),
            pair("my-bucket", "b.cmd")
        );
    }

    #[test]
    fn test_no_match() {
        assert_eq!(matched("C:\\scripts\\run.ps1"), None);
        assert_eq!(matched("/tmp/run.ps1"), None);
        assert_eq!(matched("s3://my-bucket/run.ps1"), None);
        assert_eq!(matched("https://example.com/run.ps1"), None);
        assert_eq!(matched("gs://Upper-Bucket/run.ps1"), None);
        assert_eq!(matched("gs://-bucket/run.ps1"), None);
        assert_eq!(matched(""), None);
    }

    #[test]
    fn test_anchored() {
        assert_eq!(matched(" gs://my-bucket/run.ps1"), None);
        assert_eq!(
            matched("https://evil.example/?u=https://storage.googleapis.com/b/o.ps1"),
            None
        );
    }
}
