//! Post a song, let the others guess whose it is.

use url::Url;

use crate::error::SubmissionError;
use crate::types::Payload;

const MEDIA_ID_LEN: usize = 11;

/// Hosts that serve the long-form `watch`/`embed` URL shapes
const LONG_HOSTS: &[&str] = &["youtube.com", "youtube-nocookie.com"];
/// Path prefixes followed directly by a media id
const ID_PATH_PREFIXES: &[&str] = &["embed", "shorts", "live", "v"];

pub fn build(link: String) -> Result<Payload, SubmissionError> {
    let link = link.trim().to_string();
    let media_id =
        extract_media_id(&link).ok_or_else(|| SubmissionError::InvalidLink(link.clone()))?;
    Ok(Payload::Music { link, media_id })
}

pub fn is_complete(media_id: &str) -> bool {
    is_media_id(media_id)
}

/// Voter guessed the real owner
pub fn is_correct(owner: &str, guessed_owner: &str) -> bool {
    owner == guessed_owner
}

/// Pull the media id out of the accepted link shapes:
///
/// - `youtube.com/watch?v=ID` (also `www.`, `m.` and `music.` hosts)
/// - `youtu.be/ID`
/// - `youtube.com/{embed,shorts,live,v}/ID`
///
/// The scheme is optional; ports, credentials, trailing query parameters
/// and fragments are ignored.
pub fn extract_media_id(link: &str) -> Option<String> {
    let link = link.trim();
    let url = match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => Url::parse(&format!("https://{}", link)).ok()?,
    };

    let host = url.host_str()?;
    let host = ["www.", "m.", "music."]
        .iter()
        .find_map(|prefix| host.strip_prefix(prefix))
        .unwrap_or(host);
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if host == "youtu.be" {
        segments.next().map(str::to_string)
    } else if LONG_HOSTS.contains(&host) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some(prefix) if ID_PATH_PREFIXES.contains(&prefix) => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| is_media_id(id))
}

fn is_media_id(id: &str) -> bool {
    id.len() == MEDIA_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
