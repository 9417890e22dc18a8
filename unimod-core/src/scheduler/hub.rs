//! Top-level module scheduler
//!
//! Owns the registration dispatcher and every attached transport. Optional
//! collaborators are `Option`s resolved at startup against the configured
//! [`Capabilities`]; absent ones are skipped on every tick.

use heapless::Vec;
use unimod_hal::{ByteStore, OneWireBus, RadioLink, Rs485Port};

use crate::clients::{ClientContext, ClientFactory};
use crate::config::{Capabilities, TimingConfig, UniConfig, MAX_WIRED_LINES};
use crate::gates::{NrfGate, Rs485Gate};
use crate::lines::{LineError, PermanentLine, RegistrationLine};
use crate::registry::{PersistError, RegistrationDispatcher};
use crate::traits::{ControllerLink, StateRegistry};

/// Drives all universal-module traffic
///
/// `B` is the 1-Wire bus type, `P` the RS-485 port and `R` the radio. Use
/// [`unimod_hal::Unused`] for transports the board does not have.
pub struct ModuleHub<B, P, R> {
    dispatcher: RegistrationDispatcher,
    factory: ClientFactory,
    timing: TimingConfig,
    capabilities: Capabilities,
    registration: Option<RegistrationLine<B>>,
    lines: Vec<PermanentLine<B>, MAX_WIRED_LINES>,
    rs485: Option<Rs485Gate<P>>,
    nrf: Option<NrfGate<R>>,
}

impl<B, P, R> ModuleHub<B, P, R>
where
    B: OneWireBus,
    P: Rs485Port,
    R: RadioLink,
{
    pub fn new(config: &UniConfig) -> Self {
        Self {
            dispatcher: RegistrationDispatcher::from_config(config),
            factory: ClientFactory::from_config(config),
            timing: config.timing,
            capabilities: config.capabilities,
            registration: None,
            lines: Vec::new(),
            rs485: None,
            nrf: None,
        }
    }

    /// Restore saved registrations; call once before the first update
    pub fn setup<S: ByteStore + ?Sized>(
        &mut self,
        store: &mut S,
        states: &mut dyn StateRegistry,
    ) -> bool {
        self.dispatcher.restore_state(store, states)
    }

    pub fn attach_registration_line(&mut self, bus: B) {
        self.registration = Some(RegistrationLine::new(bus));
    }

    /// Add an always-attached line; hands the bus back if all slots are taken
    pub fn add_permanent_line(&mut self, bus: B) -> Result<(), B> {
        if self.lines.is_full() {
            warn!("no free wired line slot");
            return Err(bus);
        }
        // Capacity checked above
        let _ = self.lines.push(PermanentLine::new(bus, &self.timing));
        Ok(())
    }

    /// Attach the RS-485 gate; `false` if the capability is disabled
    pub fn attach_rs485(&mut self, port: P) -> bool {
        if !self.capabilities.rs485_gate {
            return false;
        }
        self.rs485 = Some(Rs485Gate::new(
            port,
            &self.timing,
            self.capabilities.execution_module,
        ));
        true
    }

    /// Attach the radio gate; `false` if the capability is disabled
    pub fn attach_nrf(&mut self, radio: R) -> bool {
        if !self.capabilities.nrf_gate {
            return false;
        }
        self.nrf = Some(NrfGate::new(radio, &self.timing));
        true
    }

    /// Advance every attached component by `dt_ms`
    pub fn update(
        &mut self,
        dt_ms: u32,
        states: &mut dyn StateRegistry,
        controller: &mut dyn ControllerLink,
        store: &mut dyn ByteStore,
    ) {
        let mut ctx = ClientContext {
            dispatcher: &mut self.dispatcher,
            states,
            controller,
            store,
        };

        for line in self.lines.iter_mut() {
            line.update(dt_ms, &self.factory, &mut ctx);
        }
        if let Some(gate) = self.rs485.as_mut() {
            gate.update(dt_ms, &mut ctx);
        }
        if let Some(gate) = self.nrf.as_mut() {
            gate.update(dt_ms, &self.factory, &mut ctx);
        }
    }

    /// Register the module on the registration line
    ///
    /// Returns whether the module was written back.
    pub fn register_module(
        &mut self,
        states: &mut dyn StateRegistry,
        controller: &mut dyn ControllerLink,
        store: &mut dyn ByteStore,
    ) -> Result<bool, LineError> {
        let Some(line) = self.registration.as_mut() else {
            return Err(LineError::NotPresent);
        };
        let mut ctx = ClientContext {
            dispatcher: &mut self.dispatcher,
            states,
            controller,
            store,
        };
        line.register(&self.factory, &mut ctx)
    }

    /// Change and persist the RF channel, retuning the radio if attached
    pub fn set_rf_channel<S: ByteStore + ?Sized>(
        &mut self,
        channel: u8,
        store: &mut S,
    ) -> Result<(), PersistError> {
        match self.nrf.as_mut() {
            Some(gate) => gate.set_channel(channel, &mut self.dispatcher, store),
            None => self.dispatcher.set_rf_channel(store, channel),
        }
    }

    pub fn dispatcher(&self) -> &RegistrationDispatcher {
        &self.dispatcher
    }

    pub fn factory(&self) -> &ClientFactory {
        &self.factory
    }

    pub fn registration_line(&mut self) -> Option<&mut RegistrationLine<B>> {
        self.registration.as_mut()
    }

    pub fn lines(&self) -> &[PermanentLine<B>] {
        &self.lines
    }

    pub fn rs485(&self) -> Option<&Rs485Gate<P>> {
        self.rs485.as_ref()
    }

    pub fn nrf(&self) -> Option<&NrfGate<R>> {
        self.nrf.as_ref()
    }
}
