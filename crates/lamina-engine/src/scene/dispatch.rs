//! Attribute dispatch: builtin side effects plus the per-object hook.

use std::time::Instant;

use anyhow::{Context, Result};

use crate::assets::{AudioId, ImageId, PendingWatch, ReadyState, WatchKind};
use crate::core::Engine;

use super::{AttrKey, AttrValue, AudioRef, ImageRef, ObjectId};

impl Engine {
    /// Applies one attribute to an object: builtin side effects first, then
    /// the object's own hook, then the commit into attrs and snapshot.
    ///
    /// `initial` marks add-time dispatch, where every supplied attribute
    /// passes through here exactly once.
    pub(crate) fn dispatch_attr(
        &mut self,
        id: ObjectId,
        key: AttrKey,
        value: AttrValue,
        initial: bool,
    ) -> Result<()> {
        if !self.store.contains(id) {
            return Ok(());
        }

        if key == AttrKey::Delete {
            if matches!(value, AttrValue::Bool(true)) {
                self.remove_object(id);
                return Ok(());
            }
            // A non-true delete is inert; it still commits below so the
            // snapshot converges instead of re-dispatching every frame.
        }

        let mut committed = value;

        match (&key, &committed) {
            (AttrKey::Image, AttrValue::Image(ImageRef::Source(source))) => {
                if let Some(image) = self.kickoff_image(id, source.clone())? {
                    committed = AttrValue::Image(ImageRef::Handle(image));
                }
            }
            (AttrKey::Audio, AttrValue::Audio(AudioRef::Source(source))) => {
                if let Some(audio) = self.kickoff_audio(id, source.clone()) {
                    committed = AttrValue::Audio(AudioRef::Handle(audio));
                }
            }
            (AttrKey::Layer, _) => match committed.as_f32() {
                Some(target) => {
                    self.move_object_to_layer(id, (target as u32).max(1))?;
                }
                None => {
                    // No move, but the value commits so the diff settles.
                    log::warn!("object {id:?}: layer attribute expects a number, ignoring");
                }
            },
            _ => {}
        }

        // The object's own hook sees the post-side-effect value and may
        // override what gets committed.
        let replaced = match self.store.get(id) {
            Some(obj) => match obj.set_hook.clone() {
                Some(hook) => (hook.0)(&obj.attrs, &key, obj.attrs.get(&key), &committed),
                None => None,
            },
            None => return Ok(()), // a hookless delete raced us
        };
        if let Some(replacement) = replaced {
            committed = replacement;
        }

        let mut owner = 0;
        if let Some(obj) = self.store.get_mut(id) {
            obj.attrs.insert(key.clone(), committed.clone());
            obj.snapshot.insert(key, committed);
            owner = obj.layer;
        }
        if let Some(layer) = owner
            .checked_sub(1)
            .and_then(|i| self.layers.get_mut(i as usize))
        {
            layer.modified = true;
        }

        if initial {
            log::trace!("object {id:?}: initial attribute dispatched");
        }
        Ok(())
    }

    /// Starts image resolution for an object. Returns the handle when the
    /// resource is already decoded; otherwise registers a watch (pending)
    /// or logs and gives up (failed).
    fn kickoff_image(&mut self, id: ObjectId, source: String) -> Result<Option<ImageId>> {
        let image = self.images.resolve(self.resolver.as_mut(), &source);
        match self.resolver.image_state(image) {
            ReadyState::Ready => {
                self.pack_image(image)?;
                Ok(Some(image))
            }
            ReadyState::Pending => {
                self.watches.push(PendingWatch {
                    object: id,
                    kind: WatchKind::Image,
                    source,
                });
                Ok(None)
            }
            ReadyState::Failed => {
                log::warn!("image '{source}' failed to resolve; object {id:?} keeps the source");
                Ok(None)
            }
        }
    }

    fn kickoff_audio(&mut self, id: ObjectId, source: String) -> Option<AudioId> {
        let audio = self.audio.resolve(self.resolver.as_mut(), &source);
        match self.resolver.audio_state(audio) {
            ReadyState::Ready => Some(audio),
            ReadyState::Pending => {
                self.watches.push(PendingWatch {
                    object: id,
                    kind: WatchKind::Audio,
                    source,
                });
                None
            }
            ReadyState::Failed => {
                log::warn!("audio '{source}' failed to resolve; object {id:?} keeps the source");
                None
            }
        }
    }

    /// Packs a ready image into the atlas and refreshes uniforms (the sheet
    /// dimensions changed). Idempotent per handle.
    pub(crate) fn pack_image(&mut self, image: ImageId) -> Result<()> {
        if self.atlas.entry(image).is_some() {
            return Ok(());
        }
        let (width, height) = self
            .resolver
            .image_size(image)
            .context("resolver reported a ready image without dimensions")?;
        let pixels = self
            .resolver
            .image_pixels(image)
            .context("resolver reported a ready image without pixels")?;
        self.atlas.ensure_packed(image, width, height, &pixels);
        self.refresh_uniforms();
        Ok(())
    }

    /// Re-homes an object under a new 1-based layer index: old slot freed
    /// and new slot allocated in one step, so the object is never without a
    /// home between frames.
    pub(crate) fn move_object_to_layer(&mut self, id: ObjectId, target_index: u32) -> Result<()> {
        let Some(current) = self.store.get(id).map(|o| o.layer) else {
            return Ok(());
        };
        if current == target_index {
            return Ok(());
        }
        self.ensure_layers(target_index)?;

        let slot = self.store.get(id).and_then(|o| o.slot);
        if let Some(old) = current
            .checked_sub(1)
            .and_then(|i| self.layers.get_mut(i as usize))
        {
            old.remove_object(id);
            if let Some(slot) = slot {
                old.pool.free(slot);
            }
        }

        let new_layer = &mut self.layers[(target_index - 1) as usize];
        let slot = new_layer.pool.allocate();
        new_layer.push_object(id);
        if let Some(obj) = self.store.get_mut(id) {
            obj.layer = target_index;
            obj.slot = Some(slot);
        }

        log::debug!("object {id:?} moved: layer {current} -> {target_index}");
        Ok(())
    }

    /// Polls outstanding resource watches, at most once per watch interval.
    /// Completion against a removed object is a no-op; failures drop the
    /// watch.
    pub(crate) fn poll_watches(&mut self, now: Instant) -> Result<()> {
        if !self.watches.poll_due(now) {
            return Ok(());
        }

        for watch in self.watches.take() {
            match watch.kind {
                WatchKind::Image => {
                    let image = self.images.resolve(self.resolver.as_mut(), &watch.source);
                    match self.resolver.image_state(image) {
                        ReadyState::Ready => {
                            self.pack_image(image)?;
                            self.commit_resolved(
                                watch.object,
                                AttrKey::Image,
                                AttrValue::Image(ImageRef::Handle(image)),
                            );
                        }
                        ReadyState::Pending => self.watches.push(watch),
                        ReadyState::Failed => {
                            log::warn!("image '{}' failed to load; dropping watch", watch.source);
                        }
                    }
                }
                WatchKind::Audio => {
                    let audio = self.audio.resolve(self.resolver.as_mut(), &watch.source);
                    match self.resolver.audio_state(audio) {
                        ReadyState::Ready => self.commit_resolved(
                            watch.object,
                            AttrKey::Audio,
                            AttrValue::Audio(AudioRef::Handle(audio)),
                        ),
                        ReadyState::Pending => self.watches.push(watch),
                        ReadyState::Failed => {
                            log::warn!("audio '{}' failed to load; dropping watch", watch.source);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Commits a watcher-resolved value straight into attrs and snapshot,
    /// bypassing dispatch: the side effect already ran.
    fn commit_resolved(&mut self, id: ObjectId, key: AttrKey, value: AttrValue) {
        let Some(obj) = self.store.get_mut(id) else {
            return;
        };
        obj.attrs.insert(key.clone(), value.clone());
        obj.snapshot.insert(key, value);
        let owner = obj.layer;
        if let Some(layer) = owner
            .checked_sub(1)
            .and_then(|i| self.layers.get_mut(i as usize))
        {
            layer.modified = true;
        }
    }
}
