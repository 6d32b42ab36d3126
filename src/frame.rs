use crate::error::Result;
use crate::lv;
use ash::vk;
use std::sync::Arc;

/// Resources owned by one in-flight frame.
pub struct FrameData {
    pub command_buffer: lv::CommandBuffer,

    // Sync
    pub submit_fence: lv::Fence,  // Signaled when the GPU is done with this slot
    pub acquire_fence: lv::Fence, // Signaled when the acquired image is ready
    pub semaphore: lv::Semaphore, // Signaled on submit completion, waited on by present
}

impl FrameData {
    /// Allocates `count` slots. Submit fences start signaled so the first wait on each slot
    /// returns immediately.
    pub fn create_slots(
        count: usize,
        command_pool: &lv::CommandPool,
        device: Arc<lv::Device>,
    ) -> Result<Vec<FrameData>> {
        let command_buffers =
            command_pool.allocate(vk::CommandBufferLevel::PRIMARY, count as u32)?;
        command_buffers
            .into_iter()
            .map(|command_buffer| {
                Ok(FrameData {
                    command_buffer,
                    submit_fence: lv::Fence::new(
                        device.clone(),
                        Some(vk::FenceCreateFlags::SIGNALED),
                    )?,
                    acquire_fence: lv::Fence::new(device.clone(), None)?,
                    semaphore: lv::Semaphore::new(device.clone())?,
                })
            })
            .collect()
    }
}

/// One frame's worth of work, split at the points where the slot rotation matters.
///
/// `slot` indexes per-slot resources (command buffer, fences, semaphore, uniforms);
/// `image_index` is whatever the presentation engine handed out and only selects the
/// framebuffer. The two are unrelated.
pub trait FrameBackend {
    /// Blocks until the slot's previous submission has completed, then resets its fence.
    fn wait_for_slot(&mut self, slot: usize) -> Result<()>;

    /// Per-frame CPU state updates, run once the slot is known to be idle.
    fn update(&mut self, slot: usize) -> Result<()>;

    /// Acquires the next swapchain image and blocks until it is usable.
    fn acquire(&mut self, slot: usize) -> Result<u32>;

    fn record(&mut self, slot: usize, image_index: u32) -> Result<()>;

    /// Submits the slot's command buffer, signaling its semaphore and submit fence.
    fn submit(&mut self, slot: usize) -> Result<()>;

    fn present(&mut self, slot: usize, image_index: u32) -> Result<()>;
}

/// Round-robin slot index.
#[derive(Debug)]
pub struct FrameRing {
    slot_count: usize,
    current: usize,
    frames_rendered: u64,
}

impl FrameRing {
    pub fn new(slot_count: usize) -> FrameRing {
        FrameRing {
            slot_count: slot_count.max(1),
            current: 0,
            frames_rendered: 0,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Runs one frame on the current slot. The slot only advances when every step succeeded.
    pub fn render<B: FrameBackend>(&mut self, backend: &mut B) -> Result<u32> {
        let slot = self.current;

        backend.wait_for_slot(slot)?;
        backend.update(slot)?;
        let image_index = backend.acquire(slot)?;
        backend.record(slot, image_index)?;
        backend.submit(slot)?;
        backend.present(slot, image_index)?;

        log::trace!(
            "Frame {} rendered on slot {} into image {}",
            self.frames_rendered,
            slot,
            image_index
        );
        self.current = (self.current + 1) % self.slot_count;
        self.frames_rendered += 1;
        Ok(image_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Step {
        Wait(usize),
        Update(usize),
        Acquire(usize),
        Record(usize, u32),
        Submit(usize),
        Present(usize, u32),
    }

    /// Plays back a scripted sequence of image indices and tracks slot fence state.
    struct Recorder {
        steps: Vec<Step>,
        images: Vec<u32>,
        next_image: usize,
        slot_busy: Vec<bool>,
        fail_on: Option<Step>,
    }

    impl Recorder {
        fn new(slots: usize, images: Vec<u32>) -> Self {
            Recorder {
                steps: Vec::new(),
                images,
                next_image: 0,
                slot_busy: vec![false; slots],
                fail_on: None,
            }
        }

        fn push(&mut self, step: Step) -> Result<()> {
            self.steps.push(step);
            if self.fail_on == Some(step) {
                return Err(Error::Vulkan {
                    call: "vkQueueSubmit",
                    result: vk::Result::ERROR_DEVICE_LOST,
                });
            }
            Ok(())
        }
    }

    impl FrameBackend for Recorder {
        fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
            // Waiting on the fence retires whatever was submitted on this slot.
            self.slot_busy[slot] = false;
            self.push(Step::Wait(slot))
        }

        fn update(&mut self, slot: usize) -> Result<()> {
            assert!(!self.slot_busy[slot], "slot {} updated while in use", slot);
            self.push(Step::Update(slot))
        }

        fn acquire(&mut self, slot: usize) -> Result<u32> {
            self.push(Step::Acquire(slot))?;
            let image = self.images[self.next_image % self.images.len()];
            self.next_image += 1;
            Ok(image)
        }

        fn record(&mut self, slot: usize, image_index: u32) -> Result<()> {
            assert!(!self.slot_busy[slot], "slot {} recorded while in use", slot);
            self.push(Step::Record(slot, image_index))
        }

        fn submit(&mut self, slot: usize) -> Result<()> {
            self.push(Step::Submit(slot))?;
            self.slot_busy[slot] = true;
            Ok(())
        }

        fn present(&mut self, slot: usize, image_index: u32) -> Result<()> {
            self.push(Step::Present(slot, image_index))
        }
    }

    #[test]
    fn steps_run_in_order() {
        let mut ring = FrameRing::new(2);
        let mut backend = Recorder::new(2, vec![1]);

        assert_eq!(ring.render(&mut backend).unwrap(), 1);
        assert_eq!(
            backend.steps,
            vec![
                Step::Wait(0),
                Step::Update(0),
                Step::Acquire(0),
                Step::Record(0, 1),
                Step::Submit(0),
                Step::Present(0, 1),
            ]
        );
    }

    #[test]
    fn slot_wraps_around() {
        let mut ring = FrameRing::new(3);
        let mut backend = Recorder::new(3, vec![0, 1, 2]);
        let mut slots = Vec::new();

        for _ in 0..7 {
            slots.push(ring.current());
            ring.render(&mut backend).unwrap();
        }

        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(ring.frames_rendered(), 7);
        assert_eq!(ring.current(), 1);
    }

    #[test]
    fn framebuffer_follows_acquired_image_not_slot() {
        let mut ring = FrameRing::new(3);
        // The presentation engine hands images back out of order.
        let mut backend = Recorder::new(3, vec![2, 0, 0, 1]);

        for _ in 0..4 {
            ring.render(&mut backend).unwrap();
        }

        let recorded: Vec<(usize, u32)> = backend
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Record(slot, image) => Some((*slot, *image)),
                _ => None,
            })
            .collect();
        assert_eq!(recorded, vec![(0, 2), (1, 0), (2, 0), (0, 1)]);

        let presented: Vec<(usize, u32)> = backend
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Present(slot, image) => Some((*slot, *image)),
                _ => None,
            })
            .collect();
        assert_eq!(presented, recorded);
    }

    #[test]
    fn slot_is_waited_on_before_reuse() {
        let mut ring = FrameRing::new(2);
        let mut backend = Recorder::new(2, vec![0, 1]);

        for _ in 0..6 {
            ring.render(&mut backend).unwrap();
        }

        // Every submit on a slot is followed by a wait on that slot before its next update.
        for slot in 0..2 {
            let mut pending = false;
            for step in backend.steps.iter() {
                match *step {
                    Step::Submit(s) if s == slot => pending = true,
                    Step::Wait(s) if s == slot => pending = false,
                    Step::Update(s) | Step::Record(s, _) if s == slot => assert!(!pending),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn failed_step_stops_the_frame() {
        let mut ring = FrameRing::new(2);
        let mut backend = Recorder::new(2, vec![0]);
        backend.fail_on = Some(Step::Submit(0));

        let error = ring.render(&mut backend).unwrap_err();

        assert!(matches!(error, Error::Vulkan { call: "vkQueueSubmit", .. }));
        assert_eq!(backend.steps.last(), Some(&Step::Submit(0)));
        assert!(!backend.steps.contains(&Step::Present(0, 0)));
        assert_eq!(ring.current(), 0);
        assert_eq!(ring.frames_rendered(), 0);
    }

    #[test]
    fn single_slot_reuses_slot_zero() {
        let mut ring = FrameRing::new(0);
        let mut backend = Recorder::new(1, vec![0, 1, 2]);

        assert_eq!(ring.slot_count(), 1);
        for _ in 0..3 {
            ring.render(&mut backend).unwrap();
            assert_eq!(ring.current(), 0);
        }
    }
}
