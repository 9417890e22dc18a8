//! Registration dispatcher

use unimod_hal::ByteStore;
use unimod_protocol::{SensorType, NO_SENSOR_REGISTERED, SENSOR_KINDS};

use super::image::{load_image, save_image, PersistError, RegistrationImage};
use crate::config::{HardcodedCounts, UniConfig};
use crate::traits::{SensorState, StateRef, StateRegistry};

/// Assigns and persists universal sensor indices
///
/// Universal sensors of a type are numbered `hardcoded, hardcoded + 1, ...`
/// in discovery order. An index is accepted only as the next number in that
/// sequence, so numbering stays dense and is never reused.
#[derive(Debug, Clone)]
pub struct RegistrationDispatcher {
    controller_id: u8,
    hardcoded: [u8; SENSOR_KINDS],
    uni_counts: [u8; SENSOR_KINDS],
    rf_channel: u8,
    default_rf_channel: u8,
    /// Registrations not yet persisted
    dirty: bool,
}

impl RegistrationDispatcher {
    pub fn new(controller_id: u8, hardcoded: HardcodedCounts, rf_channel: u8) -> Self {
        Self {
            controller_id,
            hardcoded: hardcoded.to_array(),
            uni_counts: [0; SENSOR_KINDS],
            rf_channel,
            default_rf_channel: rf_channel,
            dirty: false,
        }
    }

    pub fn from_config(config: &UniConfig) -> Self {
        Self::new(config.controller_id, config.hardcoded, config.rf_channel)
    }

    pub fn controller_id(&self) -> u8 {
        self.controller_id
    }

    /// Built-in sensors of this type
    pub fn hardcoded_count(&self, sensor: SensorType) -> u8 {
        sensor.table_index().map_or(0, |t| self.hardcoded[t])
    }

    /// Universal sensors registered for this type
    pub fn uni_count(&self, sensor: SensorType) -> u8 {
        sensor.table_index().map_or(0, |t| self.uni_counts[t])
    }

    /// Index the next new sensor of this type will get
    ///
    /// `None` for [`SensorType::None`] or when the index space is used up.
    pub fn next_index(&self, sensor: SensorType) -> Option<u8> {
        let t = sensor.table_index()?;
        let next = self.hardcoded[t].checked_add(self.uni_counts[t])?;
        (next != NO_SENSOR_REGISTERED).then_some(next)
    }

    /// Highest registered universal index of this type
    pub fn high_water_mark(&self, sensor: SensorType) -> Option<u8> {
        let t = sensor.table_index()?;
        match self.uni_counts[t] {
            0 => None,
            n => Some(self.hardcoded[t] + n - 1),
        }
    }

    /// `index` belongs to a registered universal sensor of this type
    pub fn is_registered(&self, sensor: SensorType, index: u8) -> bool {
        match sensor.table_index() {
            Some(t) => {
                index >= self.hardcoded[t]
                    && (index as u16) < self.hardcoded[t] as u16 + self.uni_counts[t] as u16
            }
            None => false,
        }
    }

    /// Register a newly seen universal sensor
    ///
    /// Accepts only the next index of the type's sequence. On acceptance the
    /// sensor's states are created in `states` and the registration is
    /// marked for saving. Returns `false` for indices already known, gaps,
    /// and [`SensorType::None`], without side effects.
    pub fn add_uni_sensor(
        &mut self,
        states: &mut dyn StateRegistry,
        sensor: SensorType,
        index: u8,
    ) -> bool {
        let Some(t) = sensor.table_index() else {
            return false;
        };
        let Some(next) = self.next_index(sensor) else {
            warn!("no free index for {}", sensor);
            return false;
        };

        if index < next {
            return false;
        }
        if index > next {
            warn!("rejected {} index {=u8}: expected {=u8}", sensor, index, next);
            return false;
        }

        self.uni_counts[t] += 1;
        Self::create_states(states, sensor, index);
        self.dirty = true;
        info!("registered {} as index {=u8}", sensor, index);
        true
    }

    /// State sinks bound to a registered universal sensor
    ///
    /// `None` if the index was never registered or the controller dropped
    /// its state.
    pub fn registered_states(
        &self,
        states: &dyn StateRegistry,
        sensor: SensorType,
        index: u8,
    ) -> Option<SensorState> {
        if !self.is_registered(sensor, index) {
            return None;
        }

        let primary = StateRef::primary(sensor, index);
        if !states.contains(primary) {
            return None;
        }

        let secondary = StateRef::secondary(sensor, index);
        Some(SensorState {
            primary: Some(primary),
            secondary: (sensor.state_count() > 1 && states.contains(secondary)).then_some(secondary),
        })
    }

    /// Every registered universal sensor, by type then index
    pub fn registered_sensors(&self) -> impl Iterator<Item = (SensorType, u8)> + '_ {
        SensorType::REGISTRABLE.into_iter().flat_map(move |sensor| {
            let first = self.hardcoded_count(sensor);
            (0..self.uni_count(sensor)).map(move |n| (sensor, first + n))
        })
    }

    pub fn rf_channel(&self) -> u8 {
        self.rf_channel
    }

    /// Change the RF channel and persist it
    pub fn set_rf_channel<S: ByteStore + ?Sized>(
        &mut self,
        store: &mut S,
        channel: u8,
    ) -> Result<(), PersistError> {
        if self.rf_channel == channel {
            return Ok(());
        }
        info!("RF channel {=u8} -> {=u8}", self.rf_channel, channel);
        self.rf_channel = channel;
        self.save_state(store)
    }

    /// Registrations are waiting to be saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Snapshot of the current state as an image
    pub fn image(&self) -> RegistrationImage {
        let mut high_water = [NO_SENSOR_REGISTERED; SENSOR_KINDS];
        for (t, sensor) in SensorType::REGISTRABLE.into_iter().enumerate() {
            if let Some(mark) = self.high_water_mark(sensor) {
                high_water[t] = mark;
            }
        }
        RegistrationImage::new(self.hardcoded, high_water, self.rf_channel)
    }

    /// Persist high-water marks and RF channel
    pub fn save_state<S: ByteStore + ?Sized>(&mut self, store: &mut S) -> Result<(), PersistError> {
        let mut image = self.image();
        save_image(store, &mut image)?;
        self.dirty = false;
        Ok(())
    }

    /// Save if anything was registered since the last save
    ///
    /// A failed save is logged and retried on the next call.
    pub fn save_if_dirty<S: ByteStore + ?Sized>(&mut self, store: &mut S) {
        if !self.dirty {
            return;
        }
        if let Err(e) = self.save_state(store) {
            warn!("failed to save registrations: {:?}", e);
        }
    }

    /// Load the saved image and check it against the built-in counts
    pub fn read_state<S: ByteStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<RegistrationImage, PersistError> {
        let image = load_image(store)?;
        if image.hardcoded != self.hardcoded {
            return Err(PersistError::SchemaMismatch);
        }
        Ok(image)
    }

    /// Restore saved registrations and recreate their states
    ///
    /// Any failure, including a schema that no longer matches the built-in
    /// counts, leaves the dispatcher with no universal sensors and the
    /// configured RF channel. Returns whether a saved image was used.
    pub fn restore_state<S: ByteStore + ?Sized>(
        &mut self,
        store: &mut S,
        states: &mut dyn StateRegistry,
    ) -> bool {
        self.uni_counts = [0; SENSOR_KINDS];
        self.rf_channel = self.default_rf_channel;
        self.dirty = false;

        let restored = self
            .read_state(store)
            .and_then(|image| image.uni_counts().map(|counts| (image, counts)));

        let (image, counts) = match restored {
            Ok(r) => r,
            Err(PersistError::Deserialize) => {
                debug!("no registration image, starting from built-in counts");
                return false;
            }
            Err(e) => {
                warn!("discarding registration image: {:?}", e);
                return false;
            }
        };

        self.uni_counts = counts;
        self.rf_channel = image.rf_channel;

        for (sensor, index) in self.registered_sensors() {
            Self::create_states(states, sensor, index);
        }

        info!(
            "restored registrations {=[u8]}, RF channel {=u8}",
            &self.uni_counts[..],
            self.rf_channel
        );
        true
    }

    fn create_states(states: &mut dyn StateRegistry, sensor: SensorType, index: u8) {
        states.add_state(StateRef::primary(sensor, index));
        if sensor.state_count() > 1 {
            states.add_state(StateRef::secondary(sensor, index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec;
    use unimod_hal::RamStore;
    use unimod_protocol::Reading;

    #[derive(Default)]
    struct States {
        refs: Vec<StateRef>,
    }

    impl StateRegistry for States {
        fn add_state(&mut self, state: StateRef) {
            if !self.refs.contains(&state) {
                self.refs.push(state);
            }
        }

        fn contains(&self, state: StateRef) -> bool {
            self.refs.contains(&state)
        }

        fn push(&mut self, _state: StateRef, _reading: Reading) {}

        fn mark_unknown(&mut self, _state: StateRef) {}

        fn latest(&self, _state: StateRef) -> Option<Reading> {
            None
        }
    }

    fn dispatcher(temperature: u8) -> RegistrationDispatcher {
        let hardcoded = HardcodedCounts {
            temperature,
            ..Default::default()
        };
        RegistrationDispatcher::new(1, hardcoded, 19)
    }

    #[test]
    fn test_indices_follow_hardcoded() {
        let mut dispatcher = dispatcher(2);
        let mut states = States::default();

        assert_eq!(dispatcher.next_index(SensorType::Temperature), Some(2));
        assert!(dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, 2));
        assert!(dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, 3));
        assert_eq!(dispatcher.uni_count(SensorType::Temperature), 2);

        // Seen again: not new
        assert!(!dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, 2));
        assert_eq!(dispatcher.uni_count(SensorType::Temperature), 2);
        assert_eq!(dispatcher.high_water_mark(SensorType::Temperature), Some(3));
    }

    #[test]
    fn test_gap_rejected() {
        let mut dispatcher = dispatcher(0);
        let mut states = States::default();
        assert!(!dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, 1));
        assert_eq!(dispatcher.uni_count(SensorType::Temperature), 0);
        assert!(states.refs.is_empty());
        assert!(!dispatcher.is_dirty());
    }

    #[test]
    fn test_none_type_rejected() {
        let mut dispatcher = dispatcher(0);
        let mut states = States::default();
        assert!(!dispatcher.add_uni_sensor(&mut states, SensorType::None, 0));
        assert_eq!(dispatcher.next_index(SensorType::None), None);
    }

    #[test]
    fn test_humidity_gets_two_states() {
        let mut dispatcher = dispatcher(0);
        let mut states = States::default();
        assert!(dispatcher.add_uni_sensor(&mut states, SensorType::Humidity, 0));

        let linked = dispatcher
            .registered_states(&states, SensorType::Humidity, 0)
            .unwrap();
        assert_eq!(linked.primary, Some(StateRef::primary(SensorType::Humidity, 0)));
        assert_eq!(linked.secondary, Some(StateRef::secondary(SensorType::Humidity, 0)));
    }

    #[test]
    fn test_unregistered_states() {
        let mut dispatcher = dispatcher(1);
        let mut states = States::default();
        assert!(dispatcher
            .registered_states(&states, SensorType::Temperature, 1)
            .is_none());

        dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, 1);
        let linked = dispatcher
            .registered_states(&states, SensorType::Temperature, 1)
            .unwrap();
        assert_eq!(linked.secondary, None);

        // Built-in indices are not universal
        assert!(dispatcher
            .registered_states(&states, SensorType::Temperature, 0)
            .is_none());
    }

    #[test]
    fn test_registered_sensors_order() {
        let mut dispatcher = dispatcher(1);
        let mut states = States::default();
        dispatcher.add_uni_sensor(&mut states, SensorType::Ph, 0);
        dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, 1);
        dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, 2);

        let all: Vec<_> = dispatcher.registered_sensors().collect();
        assert_eq!(
            all,
            [
                (SensorType::Temperature, 1),
                (SensorType::Temperature, 2),
                (SensorType::Ph, 0),
            ]
        );
    }

    #[test]
    fn test_save_and_restore() {
        let mut store = RamStore::<64>::new();
        let mut states = States::default();

        let mut first = dispatcher(2);
        first.add_uni_sensor(&mut states, SensorType::Temperature, 2);
        first.add_uni_sensor(&mut states, SensorType::Humidity, 0);
        first.set_rf_channel(&mut store, 76).unwrap();
        assert!(!first.is_dirty());

        let mut fresh_states = States::default();
        let mut second = dispatcher(2);
        assert!(second.restore_state(&mut store, &mut fresh_states));
        assert_eq!(second.uni_count(SensorType::Temperature), 1);
        assert_eq!(second.uni_count(SensorType::Humidity), 1);
        assert_eq!(second.rf_channel(), 76);
        assert!(fresh_states.contains(StateRef::primary(SensorType::Temperature, 2)));
        assert!(fresh_states.contains(StateRef::secondary(SensorType::Humidity, 0)));
    }

    #[test]
    fn test_restore_schema_mismatch() {
        let mut store = RamStore::<64>::new();
        let mut states = States::default();

        let mut old = dispatcher(2);
        old.add_uni_sensor(&mut states, SensorType::Temperature, 2);
        old.save_state(&mut store).unwrap();

        let mut new = dispatcher(3);
        assert_eq!(new.read_state(&mut store), Err(PersistError::SchemaMismatch));
        assert!(!new.restore_state(&mut store, &mut states));
        assert_eq!(new.uni_count(SensorType::Temperature), 0);
        assert_eq!(new.next_index(SensorType::Temperature), Some(3));
        assert_eq!(new.rf_channel(), 19);
    }

    #[test]
    fn test_restore_from_erased_store() {
        let mut store = RamStore::<64>::new();
        let mut states = States::default();
        let mut dispatcher = dispatcher(0);
        assert!(!dispatcher.restore_state(&mut store, &mut states));
        assert_eq!(dispatcher.registered_sensors().count(), 0);
    }

    #[test]
    fn test_save_if_dirty() {
        let mut store = RamStore::<64>::new();
        let mut states = States::default();
        let mut dispatcher = dispatcher(0);

        dispatcher.save_if_dirty(&mut store);
        assert_eq!(store.write_count(), 0);

        dispatcher.add_uni_sensor(&mut states, SensorType::Luminosity, 0);
        dispatcher.save_if_dirty(&mut store);
        dispatcher.save_if_dirty(&mut store);
        assert_eq!(store.write_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_accepted_indices_are_dense(
            hardcoded in 0u8..8,
            attempts in proptest::collection::vec(0u8..24, 0..64),
        ) {
            let mut dispatcher = dispatcher(hardcoded);
            let mut states = States::default();
            let mut accepted = Vec::new();

            for index in attempts {
                let before = dispatcher.uni_count(SensorType::Temperature);
                if dispatcher.add_uni_sensor(&mut states, SensorType::Temperature, index) {
                    accepted.push(index);
                } else {
                    prop_assert_eq!(dispatcher.uni_count(SensorType::Temperature), before);
                }
            }

            for (n, index) in accepted.iter().enumerate() {
                prop_assert_eq!(*index, hardcoded + n as u8);
            }
        }
    }
}
