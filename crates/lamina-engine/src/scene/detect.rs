//! Frame-over-frame change detection.

use anyhow::Result;

use crate::core::Engine;

use super::{AttrKey, AttrValue, ObjectId};

impl Engine {
    /// Diffs every canvas-layer object against its snapshot and dispatches
    /// each changed attribute.
    ///
    /// GPU layers are skipped: their streams are re-derived every frame by
    /// the packer, so the diff would only duplicate work. After a pass the
    /// snapshot of every diffed object matches its live attributes.
    pub(crate) fn detect_changes(&mut self) -> Result<()> {
        let mut changes: Vec<(ObjectId, AttrKey, AttrValue)> = Vec::new();

        for layer in &self.layers {
            if layer.config().use_gpu {
                continue;
            }
            for &id in layer.objects() {
                let Some(obj) = self.store.get(id) else {
                    continue;
                };
                for (key, value) in obj.attrs() {
                    if obj.snapshot.get(key) != Some(value) {
                        changes.push((id, key.clone(), value.clone()));
                    }
                }
            }
        }

        for (id, key, value) in changes {
            // A delete earlier in the batch may have taken the object with
            // it; dispatch tolerates that.
            self.dispatch_attr(id, key, value, false)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::EngineConfig;
    use crate::layer::LayerConfig;
    use crate::scene::{AttrMap, ImageRef};

    use super::*;

    fn engine() -> Engine {
        Engine::new(EngineConfig::headless(100.0, 100.0)).unwrap()
    }

    fn attrs(entries: &[(AttrKey, AttrValue)]) -> AttrMap {
        entries.iter().cloned().collect()
    }

    #[test]
    fn raw_write_is_dispatched_on_detect() {
        let mut e = engine();
        let id = e
            .add_object(attrs(&[(AttrKey::X, AttrValue::Float(1.0))]))
            .unwrap();
        e.layer(1).unwrap();
        // add-time dispatch synced the snapshot
        assert_eq!(e.object(id).unwrap().snapshot.get(&AttrKey::X), Some(&AttrValue::Float(1.0)));

        e.update_object(id, AttrKey::X, AttrValue::Float(7.0));
        e.detect_changes().unwrap();

        let obj = e.object(id).unwrap();
        assert_eq!(obj.x(), 7.0);
        assert_eq!(obj.snapshot.get(&AttrKey::X), Some(&AttrValue::Float(7.0)));
    }

    #[test]
    fn detect_marks_layer_modified() {
        let mut e = engine();
        let id = e.add_object(AttrMap::new()).unwrap();
        e.layers[0].modified = false;

        e.detect_changes().unwrap();
        assert!(!e.layers[0].modified);

        e.update_object(id, AttrKey::Y, AttrValue::Float(3.0));
        e.detect_changes().unwrap();
        assert!(e.layers[0].modified);
    }

    #[test]
    fn gpu_layers_are_not_diffed() {
        let mut e = engine();
        let gpu = e.add_layer(LayerConfig::gpu()).unwrap();
        let id = e
            .add_object(attrs(&[(AttrKey::Layer, AttrValue::Float(gpu as f32))]))
            .unwrap();

        // A raw image write on a GPU-layer object stays un-dispatched: the
        // packer consumes the attribute directly each frame.
        e.update_object(
            id,
            AttrKey::Image,
            AttrValue::Image(ImageRef::Source("x.png".into())),
        );
        e.detect_changes().unwrap();

        assert!(e.watches.is_empty());
        assert!(matches!(
            e.object(id).unwrap().image_ref(),
            Some(ImageRef::Source(_))
        ));
    }

    #[test]
    fn inert_delete_converges_after_one_pass() {
        let mut e = engine();
        let id = e.add_object(AttrMap::new()).unwrap();

        e.update_object(id, AttrKey::Delete, AttrValue::Bool(false));
        e.detect_changes().unwrap();

        let obj = e.object(id).unwrap();
        assert_eq!(
            obj.snapshot.get(&AttrKey::Delete),
            obj.attrs.get(&AttrKey::Delete)
        );

        // Converged: the next pass has nothing left to dispatch.
        e.layers[0].modified = false;
        e.detect_changes().unwrap();
        assert!(!e.layers[0].modified);
    }

    #[test]
    fn non_numeric_layer_value_converges_without_moving() {
        let mut e = engine();
        let id = e.add_object(AttrMap::new()).unwrap();

        e.update_object(id, AttrKey::Layer, AttrValue::Bool(true));
        e.detect_changes().unwrap();

        let obj = e.object(id).unwrap();
        assert_eq!(obj.layer_index(), 1);
        assert_eq!(
            obj.snapshot.get(&AttrKey::Layer),
            obj.attrs.get(&AttrKey::Layer)
        );

        e.layers[0].modified = false;
        e.detect_changes().unwrap();
        assert!(!e.layers[0].modified);
    }

    #[test]
    fn delete_via_attribute_wins_over_other_changes() {
        let mut e = engine();
        let id = e.add_object(AttrMap::new()).unwrap();

        e.update_object(id, AttrKey::X, AttrValue::Float(5.0));
        e.update_object(id, AttrKey::Delete, AttrValue::Bool(true));
        e.detect_changes().unwrap();

        assert!(e.object(id).is_none());
    }
}
