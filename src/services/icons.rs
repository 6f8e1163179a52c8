//! Icon fetch queue and cache.
//!
//! The queue is owned by a single caller. Fetching happens elsewhere (see
//! [`drain_icons`]) and results come back as [`IconCompletion`] messages, so
//! the queue and the cache are never touched by two callers at once.
//!
//! Only one fetch is in flight at any time: [`IconQueue::dequeue_next`]
//! returns nothing while a request is outstanding.

use crate::models::AchievementInfo;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised while fetching or decoding an icon
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IconError {
    #[error("Icon download failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Icon data is not a recognized image ({0} bytes)")]
    UnrecognizedFormat(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

/// An icon held by the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconImage {
    /// Placeholder used for icons that could not be fetched or decoded.
    Blank,
    Decoded { format: ImageFormat, bytes: Vec<u8> },
}

/// Validate raw bytes as one of the image formats the CDN serves.
pub fn decode_icon(bytes: Vec<u8>) -> Result<IconImage, IconError> {
    let format = if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        ImageFormat::Jpeg
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        ImageFormat::Png
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        ImageFormat::Gif
    } else {
        return Err(IconError::UnrecognizedFormat(bytes.len()));
    };
    Ok(IconImage::Decoded { format, bytes })
}

/// Icons keyed by icon file name.
///
/// Slot 0 is always the shared blank image, so a resolved index is never 0.
#[derive(Debug, Clone)]
pub struct IconCache {
    images: Vec<IconImage>,
    by_key: IndexMap<String, usize>,
}

impl IconCache {
    pub fn new() -> Self {
        Self {
            images: vec![IconImage::Blank],
            by_key: IndexMap::new(),
        }
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn image(&self, index: usize) -> Option<&IconImage> {
        self.images.get(index)
    }

    /// Register an image under `key`, returning its slot.
    ///
    /// Re-registering a key keeps the first slot.
    pub fn register(&mut self, key: &str, image: IconImage) -> usize {
        if let Some(index) = self.index_of(key) {
            return index;
        }
        self.images.push(image);
        let index = self.images.len() - 1;
        self.by_key.insert(key.to_string(), index);
        index
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IconQueueEntry {
    achievement_id: String,
    icon_key: String,
}

/// A fetch handed to the icon fetcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconRequest {
    pub game_id: u32,
    pub achievement_id: String,
    pub icon_key: String,
    /// Queue generation the request was issued in.
    pub generation: u64,
}

impl IconRequest {
    /// `<cdn_base>/<game id>/<icon file>`
    pub fn url(&self, cdn_base: &str) -> String {
        format!(
            "{}/{}/{}",
            cdn_base.trim_end_matches('/'),
            self.game_id,
            self.icon_key
        )
    }
}

/// Result of one fetch, sent back to the queue owner
#[derive(Debug, Clone, PartialEq)]
pub struct IconCompletion {
    pub request: IconRequest,
    pub result: Result<Vec<u8>, IconError>,
}

/// What the owner should do after a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconOutcome {
    pub achievement_id: String,
    pub icon_key: String,
    pub image_index: usize,
    /// The request predates the last [`IconQueue::clear`], so `achievement_id`
    /// may name a record that no longer exists.
    pub stale: bool,
    /// Nothing left to fetch.
    pub idle: bool,
}

/// FIFO of achievements waiting for an icon, plus the icon cache.
#[derive(Debug, Clone)]
pub struct IconQueue {
    game_id: u32,
    pending: VecDeque<IconQueueEntry>,
    in_flight: Option<IconRequest>,
    generation: u64,
    cache: IconCache,
}

impl IconQueue {
    pub fn new(game_id: u32) -> Self {
        Self {
            game_id,
            pending: VecDeque::new(),
            in_flight: None,
            generation: 0,
            cache: IconCache::new(),
        }
    }

    pub fn cache(&self) -> &IconCache {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// A fetch is outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Queue `info` for an icon, or resolve it at once from the cache.
    pub fn enqueue(&mut self, info: &mut AchievementInfo) {
        let key = info.icon_key();
        if key.is_empty() {
            info.image_index = Some(0);
            return;
        }

        if let Some(index) = self.cache.index_of(key) {
            info.image_index = Some(index);
            return;
        }

        self.pending.push_back(IconQueueEntry {
            achievement_id: info.id.clone(),
            icon_key: key.to_string(),
        });
    }

    /// Pop the next request unless a fetch is already in flight.
    ///
    /// Entries whose icon got cached while they waited are skipped.
    pub fn dequeue_next(&mut self) -> Option<IconRequest> {
        if self.is_busy() {
            return None;
        }

        while let Some(entry) = self.pending.pop_front() {
            if self.cache.index_of(&entry.icon_key).is_some() {
                continue;
            }
            let request = IconRequest {
                game_id: self.game_id,
                achievement_id: entry.achievement_id,
                icon_key: entry.icon_key,
                generation: self.generation,
            };
            self.in_flight = Some(request.clone());
            return Some(request);
        }

        None
    }

    /// Register a finished fetch.
    ///
    /// Fetch and decode failures register the blank placeholder so the queue
    /// keeps moving. Completions from before the last [`clear`](Self::clear)
    /// are flagged stale; they still fill the cache when the game is unchanged.
    /// Any completion of the outstanding request releases the busy flag.
    pub fn complete(&mut self, completion: IconCompletion) -> IconOutcome {
        let IconCompletion { request, result } = completion;

        if self.in_flight.as_ref() == Some(&request) {
            self.in_flight = None;
        }
        let stale = request.generation != self.generation;

        let image = match result.and_then(decode_icon) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Icon {} unavailable: {}", request.icon_key, e);
                IconImage::Blank
            }
        };
        let image_index = if request.game_id == self.game_id {
            self.cache.register(&request.icon_key, image)
        } else {
            tracing::debug!(
                "Dropping icon {} fetched for game {}",
                request.icon_key,
                request.game_id
            );
            0
        };

        IconOutcome {
            achievement_id: request.achievement_id,
            icon_key: request.icon_key,
            image_index,
            stale,
            idle: self.pending.is_empty() && self.in_flight.is_none(),
        }
    }

    /// Drop every pending entry.
    ///
    /// Used when a new schema is loaded. There is no cancellation: an
    /// outstanding fetch keeps the queue busy until its completion arrives,
    /// and that completion is flagged stale.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.generation += 1;
    }

    /// Point the queue at another game. Clears pending work.
    pub fn reset_for_game(&mut self, game_id: u32) {
        self.clear();
        if self.game_id != game_id {
            self.cache = IconCache::new();
        }
        self.game_id = game_id;
    }
}

/// Downloads icon bytes.
pub trait IconFetcher: Send + Sync {
    fn fetch(&self, request: &IconRequest) -> impl Future<Output = Result<Vec<u8>, IconError>> + Send;
}

/// Fetches icons from the vendor CDN over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIconFetcher {
    client: reqwest::Client,
    cdn_base: String,
}

impl HttpIconFetcher {
    pub fn new(cdn_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cdn_base: cdn_base.into(),
        }
    }
}

impl IconFetcher for HttpIconFetcher {
    async fn fetch(&self, request: &IconRequest) -> Result<Vec<u8>, IconError> {
        let url = request.url(&self.cdn_base);
        let fetch_error = |message: String| IconError::Fetch {
            url: url.clone(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        tracing::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Run the fetches for `requests` one at a time, reporting each completion.
///
/// Stops early if the receiving side has gone away.
pub async fn drain_icons<F: IconFetcher>(
    fetcher: &F,
    requests: mpsc::Receiver<IconRequest>,
    completions: mpsc::Sender<IconCompletion>,
) {
    let mut requests = requests;
    while let Some(request) = requests.recv().await {
        let result = fetcher.fetch(&request).await;
        if completions
            .send(IconCompletion { request, result })
            .await
            .is_err()
        {
            tracing::debug!("Icon completion receiver closed, stopping fetches");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AchievementDefinition;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00];

    fn info(id: &str, icon: &str, gray: &str, achieved: bool) -> AchievementInfo {
        let definition = AchievementDefinition {
            id: id.to_string(),
            name: id.to_string(),
            icon_unlocked: icon.to_string(),
            icon_locked: gray.to_string(),
            ..Default::default()
        };
        AchievementInfo::from_definition(&definition, achieved, 0)
    }

    fn ok(request: IconRequest, bytes: &[u8]) -> IconCompletion {
        IconCompletion {
            request,
            result: Ok(bytes.to_vec()),
        }
    }

    #[test]
    fn test_decode_signatures() {
        assert!(matches!(
            decode_icon(JPEG.to_vec()),
            Ok(IconImage::Decoded {
                format: ImageFormat::Jpeg,
                ..
            })
        ));
        assert!(matches!(
            decode_icon(b"GIF89a....".to_vec()),
            Ok(IconImage::Decoded {
                format: ImageFormat::Gif,
                ..
            })
        ));
        assert_eq!(
            decode_icon(b"<html>".to_vec()),
            Err(IconError::UnrecognizedFormat(6))
        );
    }

    #[test]
    fn test_enqueue_uses_state_specific_key() {
        let mut queue = IconQueue::new(480);
        let mut locked = info("ACH_A", "a.jpg", "a_gray.jpg", false);
        queue.enqueue(&mut locked);

        let request = queue.dequeue_next().unwrap();
        assert_eq!(request.icon_key, "a_gray.jpg");
        assert_eq!(
            request.url("https://cdn.example/apps/"),
            "https://cdn.example/apps/480/a_gray.jpg"
        );
    }

    #[test]
    fn test_cache_hit_does_not_grow_queue() {
        let mut queue = IconQueue::new(480);
        let mut first = info("ACH_A", "a.jpg", "", true);
        queue.enqueue(&mut first);
        let request = queue.dequeue_next().unwrap();
        let outcome = queue.complete(ok(request, JPEG));
        assert!(outcome.idle);

        let mut second = info("ACH_B", "a.jpg", "", true);
        queue.enqueue(&mut second);
        assert_eq!(queue.len(), 0);
        assert_eq!(second.image_index, Some(outcome.image_index));
        assert_ne!(second.image_index, Some(0));
    }

    #[test]
    fn test_one_request_in_flight() {
        let mut queue = IconQueue::new(480);
        let mut a = info("ACH_A", "a.jpg", "", true);
        let mut b = info("ACH_B", "b.jpg", "", true);
        queue.enqueue(&mut a);
        queue.enqueue(&mut b);

        let first = queue.dequeue_next().unwrap();
        assert!(queue.is_busy());
        assert!(queue.dequeue_next().is_none());

        let outcome = queue.complete(ok(first, JPEG));
        assert!(!outcome.idle);
        assert_eq!(queue.dequeue_next().unwrap().achievement_id, "ACH_B");
    }

    #[test]
    fn test_failures_register_blank_and_continue() {
        let mut queue = IconQueue::new(480);
        let mut a = info("ACH_A", "a.jpg", "", true);
        queue.enqueue(&mut a);
        let request = queue.dequeue_next().unwrap();

        let outcome = queue.complete(IconCompletion {
            request,
            result: Err(IconError::Fetch {
                url: "x".to_string(),
                message: "404".to_string(),
            }),
        });
        assert!(outcome.idle);
        assert!(!queue.is_busy());
        assert_eq!(
            queue.cache().image(outcome.image_index),
            Some(&IconImage::Blank)
        );
    }

    #[test]
    fn test_stale_completion_after_clear() {
        let mut queue = IconQueue::new(480);
        let mut a = info("ACH_A", "a.jpg", "", true);
        let mut b = info("ACH_B", "b.jpg", "", true);
        queue.enqueue(&mut a);
        queue.enqueue(&mut b);
        let request = queue.dequeue_next().unwrap();

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.is_busy());

        let outcome = queue.complete(ok(request, JPEG));
        assert!(outcome.stale);
        assert!(outcome.idle);
        assert!(!queue.is_busy());
        assert!(queue.cache().index_of("a.jpg").is_some());
    }

    #[test]
    fn test_clear_keeps_single_request_in_flight() {
        let mut queue = IconQueue::new(480);
        let mut a = info("ACH_A", "a.jpg", "", true);
        queue.enqueue(&mut a);
        let abandoned = queue.dequeue_next().unwrap();

        queue.clear();
        let mut b = info("ACH_B", "b.jpg", "", true);
        queue.enqueue(&mut b);
        assert!(queue.dequeue_next().is_none());

        let outcome = queue.complete(ok(abandoned, JPEG));
        assert!(outcome.stale);
        assert!(!outcome.idle);

        let next = queue.dequeue_next().unwrap();
        assert_eq!(next.achievement_id, "ACH_B");
        assert_eq!(next.generation, 1);
    }

    #[test]
    fn test_completion_for_previous_game_not_cached() {
        let mut queue = IconQueue::new(480);
        let mut a = info("ACH_A", "a.jpg", "", true);
        queue.enqueue(&mut a);
        let request = queue.dequeue_next().unwrap();

        queue.reset_for_game(730);
        assert!(queue.is_busy());

        let outcome = queue.complete(ok(request, JPEG));
        assert!(outcome.stale);
        assert!(!queue.is_busy());
        assert!(queue.cache().is_empty());
    }

    #[test]
    fn test_duplicate_pending_keys_fetched_once() {
        let mut queue = IconQueue::new(480);
        let mut a = info("ACH_A", "shared.jpg", "", true);
        let mut b = info("ACH_B", "shared.jpg", "", true);
        queue.enqueue(&mut a);
        queue.enqueue(&mut b);
        assert_eq!(queue.len(), 2);

        let request = queue.dequeue_next().unwrap();
        queue.complete(ok(request, JPEG));
        assert!(queue.dequeue_next().is_none());
    }

    struct FixedFetcher;

    impl IconFetcher for FixedFetcher {
        async fn fetch(&self, request: &IconRequest) -> Result<Vec<u8>, IconError> {
            if request.icon_key.ends_with(".jpg") {
                Ok(JPEG.to_vec())
            } else {
                Err(IconError::Fetch {
                    url: request.icon_key.clone(),
                    message: "not found".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_drain_icons_reports_each_request() {
        let (request_tx, request_rx) = mpsc::channel(4);
        let (completion_tx, mut completion_rx) = mpsc::channel(4);

        let mut queue = IconQueue::new(480);
        let mut a = info("ACH_A", "a.jpg", "", true);
        queue.enqueue(&mut a);
        request_tx.send(queue.dequeue_next().unwrap()).await.unwrap();
        drop(request_tx);

        drain_icons(&FixedFetcher, request_rx, completion_tx).await;

        let completion = completion_rx.recv().await.unwrap();
        assert_eq!(completion.request.achievement_id, "ACH_A");
        let outcome = queue.complete(completion);
        assert!(outcome.idle);
        assert!(completion_rx.recv().await.is_none());
    }
}
