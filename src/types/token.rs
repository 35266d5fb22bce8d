pub type UploadCancellationToken = tokio_util::sync::CancellationToken;

pub fn create_upload_cancellation_token() -> UploadCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
