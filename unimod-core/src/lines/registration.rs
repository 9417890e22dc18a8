//! Onboarding line
//!
//! A module plugged into the registration port is read, optionally edited by
//! the user, registered and written back with the indices it was given.

use unimod_hal::OneWireBus;
use unimod_protocol::RawScratchpad;

use super::LineError;
use crate::clients::{ClientContext, ClientFactory, ModuleClient};
use crate::codec::ScratchpadCodec;

/// Line dedicated to registering new modules
pub struct RegistrationLine<B> {
    bus: B,
    /// Last good read, possibly with pending edits
    scratchpad: RawScratchpad,
    has_data: bool,
    /// The buffer holds edits not yet written to the module
    pending: bool,
}

impl<B: OneWireBus> RegistrationLine<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            scratchpad: RawScratchpad::default(),
            has_data: false,
            pending: false,
        }
    }

    /// Presence probe
    pub fn is_module_present(&mut self) -> bool {
        self.bus.reset()
    }

    /// Read the attached module into the line buffer
    ///
    /// Discards pending edits. On failure the buffer keeps the previous
    /// good read.
    pub fn read(&mut self) -> Result<(), LineError> {
        let mut fresh = RawScratchpad::default();
        ScratchpadCodec::begin(&mut self.bus, &mut fresh).read()?;
        self.scratchpad = fresh;
        self.has_data = true;
        self.pending = false;
        Ok(())
    }

    /// Copy the line buffer out; `false` if nothing was read yet
    pub fn copy_scratchpad(&self, dest: &mut RawScratchpad) -> bool {
        if !self.has_data {
            return false;
        }
        dest.clone_from(&self.scratchpad);
        true
    }

    /// Replace the line buffer with edited data
    ///
    /// Only accepted for the same kind of module that was read; the edits
    /// are written on the next [`RegistrationLine::register`].
    pub fn set_scratchpad_data(&mut self, src: &RawScratchpad) -> bool {
        if !self.has_data || !self.is_same_scratchpad_type(src) {
            return false;
        }
        self.scratchpad.clone_from(src);
        self.scratchpad.update_crc();
        self.pending = true;
        true
    }

    /// `other` has the same packet type and subtype as the line buffer
    pub fn is_same_scratchpad_type(&self, other: &RawScratchpad) -> bool {
        self.has_data && self.scratchpad.head.is_same_type(&other.head)
    }

    /// Register the attached module
    ///
    /// Re-reads the module, keeps pending edits if it is still the same kind
    /// of module, runs the client's registration and writes the result back
    /// when anything changed. Returns whether the module was written.
    ///
    /// If the write-back fails the registered buffer stays pending, so the
    /// next call writes the same indices instead of assigning new ones.
    pub fn register(
        &mut self,
        factory: &ClientFactory,
        ctx: &mut ClientContext<'_>,
    ) -> Result<bool, LineError> {
        if !self.bus.reset() {
            return Err(LineError::NotPresent);
        }

        let mut fresh = RawScratchpad::default();
        if let Err(e) = ScratchpadCodec::begin(&mut self.bus, &mut fresh).read() {
            debug!("registration read failed: {:?}", e);
            return Err(e.into());
        }

        if !self.pending || !self.is_same_scratchpad_type(&fresh) {
            if self.pending {
                info!("module swapped on registration line, dropping edits");
            }
            self.scratchpad = fresh;
            self.has_data = true;
        }

        let changed = factory.client(&self.scratchpad).register(&mut self.scratchpad, ctx);
        ctx.dispatcher.save_if_dirty(ctx.store);

        // Assigned indices stay pending until the module has stored them
        let write = changed || self.pending;
        self.pending = write;
        if write {
            let mut codec = ScratchpadCodec::begin(&mut self.bus, &mut self.scratchpad);
            codec.write()?;
            codec.save()?;
            self.pending = false;
        }
        Ok(write)
    }
}
