use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// One bounded attempt per candidate URL; no retries within a candidate.
const IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bodies smaller than this that don't declare an image content type are
/// taken to be interstitial HTML, not the image itself.
const MIN_IMAGE_BYTES: usize = 5000;

/// The URL formats under which a drive-hosted file may be directly
/// retrievable, in the order worth trying.
pub fn candidate_urls(file_id: &str) -> [String; 4] {
    [
        format!("https://drive.google.com/uc?export=view&id={}", file_id),
        format!("https://lh3.googleusercontent.com/d/{}", file_id),
        format!("https://drive.google.com/uc?id={}&export=download", file_id),
        format!("https://docs.google.com/uc?id={}&export=download", file_id),
    ]
}

/// Try each candidate URL for the image until one yields plausible image
/// bytes. Exhausting the candidates is `None`, never an error: a missing
/// diagram must not take down the rest of the parameter view.
pub async fn fetch_image(client: &Client, file_id: &str) -> Option<Vec<u8>> {
    for url in candidate_urls(file_id) {
        let response = match client.get(&url).timeout(IMAGE_TIMEOUT).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%url, error = %e, "image candidate failed");
                continue;
            }
        };

        if !response.status().is_success() {
            debug!(%url, status = %response.status(), "image candidate rejected");
            continue;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                debug!(%url, error = %e, "image candidate body unreadable");
                continue;
            }
        };

        if content_type.contains("image") || bytes.len() > MIN_IMAGE_BYTES {
            debug!(%url, bytes = bytes.len(), "image fetched");
            return Some(bytes.to_vec());
        }
    }

    warn!(%file_id, "no image candidate yielded image data");
    None
}
