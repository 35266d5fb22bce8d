use url::Url;

const NO_BUCKET_NAME_SPECIFIED: &str = "bucket name must be specified.";
const INVALID_SCHEME: &str = "scheme must be s3:// .";
const INVALID_BUCKET_NAME: &str =
    "bucket name must consist of lowercase letters, numbers, dots and hyphens.";

const S3_SCHEME_PREFIX: &str = "s3://";

/// Accepts `bucket` or `s3://bucket[/prefix]`.
pub fn check_bucket(value: &str) -> Result<String, String> {
    parse_bucket(value)?;
    Ok(value.to_string())
}

/// Splits a bucket argument into bucket name and the prefix embedded in an `s3://` URI.
pub fn parse_bucket(value: &str) -> Result<(String, Option<String>), String> {
    if value.is_empty() {
        return Err(NO_BUCKET_NAME_SPECIFIED.to_string());
    }

    if !value.contains("://") {
        check_bucket_name(value)?;
        return Ok((value.to_string(), None));
    }

    if !value.starts_with(S3_SCHEME_PREFIX) {
        return Err(INVALID_SCHEME.to_string());
    }

    let parsed = Url::parse(value).map_err(|e| e.to_string())?;
    let bucket = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| NO_BUCKET_NAME_SPECIFIED.to_string())?;
    check_bucket_name(bucket)?;

    let rest = value[S3_SCHEME_PREFIX.len()..]
        .strip_prefix(bucket)
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .ok_or_else(|| INVALID_BUCKET_NAME.to_string())?;
    let prefix = rest.trim_start_matches('/');
    let prefix = if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    };

    Ok((bucket.to_string(), prefix))
}

fn check_bucket_name(bucket: &str) -> Result<(), String> {
    let valid = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    if !valid || bucket.starts_with(['.', '-']) {
        return Err(INVALID_BUCKET_NAME.to_string());
    }

    Ok(())
}
