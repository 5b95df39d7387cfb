use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Handle to an image known to the resolver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u32);

/// Handle to an audio resource known to the resolver.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AudioId(pub u32);

/// Readiness of an asynchronously resolving resource.
///
/// `Failed` is terminal: the engine logs it and stops watching, instead of
/// polling a resource that will never arrive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadyState {
    Pending,
    Ready,
    Failed,
}

/// Interface the engine uses to resolve source strings into decoded
/// resources. Decoding itself happens outside the engine; implementations
/// only need to answer polls without blocking.
pub trait ResourceResolver {
    /// Registers interest in an image source and returns its handle.
    /// Repeated calls for the same source must return the same handle.
    fn request_image(&mut self, source: &str) -> ImageId;

    fn image_state(&self, id: ImageId) -> ReadyState;

    /// Natural pixel dimensions, available once the image is `Ready`.
    fn image_size(&self, id: ImageId) -> Option<(u32, u32)>;

    /// Tightly packed RGBA8 pixels, available once the image is `Ready`.
    fn image_pixels(&self, id: ImageId) -> Option<Vec<u8>>;

    fn request_audio(&mut self, source: &str) -> AudioId;

    fn audio_state(&self, id: AudioId) -> ReadyState;
}

struct StaticImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Default)]
struct StaticState {
    images: Vec<Option<StaticImage>>,
    images_by_source: HashMap<String, ImageId>,
    audio: Vec<bool>,
    audio_by_source: HashMap<String, AudioId>,
    held: HashSet<String>,
    sources: HashMap<ImageId, String>,
    audio_sources: HashMap<AudioId, String>,
}

/// In-memory resolver over preloaded pixel data.
///
/// Inserted sources resolve as `Ready` immediately unless held with
/// [`hold`]; held sources stay `Pending` until [`release`] is called, which
/// is how tests (and embedders with their own decode step) model
/// asynchronous completion. Unknown sources resolve as `Failed`.
///
/// Clones share state, so a caller can keep a handle and release sources
/// after the engine has taken ownership of the boxed resolver.
///
/// [`hold`]: StaticResolver::hold
/// [`release`]: StaticResolver::release
#[derive(Default, Clone)]
pub struct StaticResolver {
    state: Rc<RefCell<StaticState>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preloads a decoded image under `source`.
    pub fn insert_image(&self, source: &str, width: u32, height: u32, pixels: Vec<u8>) {
        let id = register_image(&mut self.state.borrow_mut(), source);
        self.state.borrow_mut().images[id.0 as usize] = Some(StaticImage {
            width,
            height,
            pixels,
        });
    }

    /// Preloads an audio resource under `source`.
    pub fn insert_audio(&self, source: &str) {
        let id = register_audio(&mut self.state.borrow_mut(), source);
        self.state.borrow_mut().audio[id.0 as usize] = true;
    }

    /// Keeps `source` reporting `Pending` even when its data is present.
    pub fn hold(&self, source: &str) {
        self.state.borrow_mut().held.insert(source.to_owned());
    }

    /// Lets a held `source` complete on the next poll.
    pub fn release(&self, source: &str) {
        self.state.borrow_mut().held.remove(source);
    }
}

fn register_image(state: &mut StaticState, source: &str) -> ImageId {
    if let Some(&id) = state.images_by_source.get(source) {
        return id;
    }
    let id = ImageId(state.images.len() as u32);
    state.images.push(None);
    state.images_by_source.insert(source.to_owned(), id);
    state.sources.insert(id, source.to_owned());
    id
}

fn register_audio(state: &mut StaticState, source: &str) -> AudioId {
    if let Some(&id) = state.audio_by_source.get(source) {
        return id;
    }
    let id = AudioId(state.audio.len() as u32);
    state.audio.push(false);
    state.audio_by_source.insert(source.to_owned(), id);
    state.audio_sources.insert(id, source.to_owned());
    id
}

impl ResourceResolver for StaticResolver {
    fn request_image(&mut self, source: &str) -> ImageId {
        register_image(&mut self.state.borrow_mut(), source)
    }

    fn image_state(&self, id: ImageId) -> ReadyState {
        let state = self.state.borrow();
        let Some(source) = state.sources.get(&id) else {
            return ReadyState::Failed;
        };
        if state.held.contains(source) {
            return ReadyState::Pending;
        }
        match state.images.get(id.0 as usize) {
            Some(Some(_)) => ReadyState::Ready,
            _ => ReadyState::Failed,
        }
    }

    fn image_size(&self, id: ImageId) -> Option<(u32, u32)> {
        let state = self.state.borrow();
        let img = state.images.get(id.0 as usize)?.as_ref()?;
        Some((img.width, img.height))
    }

    fn image_pixels(&self, id: ImageId) -> Option<Vec<u8>> {
        let state = self.state.borrow();
        let img = state.images.get(id.0 as usize)?.as_ref()?;
        Some(img.pixels.clone())
    }

    fn request_audio(&mut self, source: &str) -> AudioId {
        register_audio(&mut self.state.borrow_mut(), source)
    }

    fn audio_state(&self, id: AudioId) -> ReadyState {
        let state = self.state.borrow();
        let Some(source) = state.audio_sources.get(&id) else {
            return ReadyState::Failed;
        };
        if state.held.contains(source) {
            return ReadyState::Pending;
        }
        match state.audio.get(id.0 as usize) {
            Some(true) => ReadyState::Ready,
            _ => ReadyState::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_image_is_ready_with_size() {
        let mut r = StaticResolver::new();
        r.insert_image("a.png", 2, 3, vec![0; 24]);

        let id = r.request_image("a.png");
        assert_eq!(r.image_state(id), ReadyState::Ready);
        assert_eq!(r.image_size(id), Some((2, 3)));
    }

    #[test]
    fn same_source_returns_same_handle() {
        let mut r = StaticResolver::new();
        let a = r.request_image("x.png");
        let b = r.request_image("x.png");
        assert_eq!(a, b);
    }

    #[test]
    fn held_source_stays_pending_until_released() {
        let mut r = StaticResolver::new();
        r.insert_image("slow.png", 1, 1, vec![0; 4]);
        r.hold("slow.png");

        let id = r.request_image("slow.png");
        assert_eq!(r.image_state(id), ReadyState::Pending);

        r.release("slow.png");
        assert_eq!(r.image_state(id), ReadyState::Ready);
    }

    #[test]
    fn clones_share_state() {
        let mut r = StaticResolver::new();
        let handle = r.clone();
        let id = r.request_image("late.png");
        assert_eq!(r.image_state(id), ReadyState::Failed);

        handle.insert_image("late.png", 1, 1, vec![0; 4]);
        assert_eq!(r.image_state(id), ReadyState::Ready);
    }

    #[test]
    fn unknown_source_fails() {
        let mut r = StaticResolver::new();
        let id = r.request_image("missing.png");
        assert_eq!(r.image_state(id), ReadyState::Failed);
    }
}
