use embedded_hal::delay::DelayNs;

use crate::device::Result;

/// Default pause between probe steps, in milliseconds.
pub const PAUSE_MS: u32 = 1000;

/// Bulk endpoint pair of the tester interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub bulk_out: u8,
    pub bulk_in: u8,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            bulk_out: 0x01,
            bulk_in: 0x81,
        }
    }
}

impl Endpoints {
    /// Pick the first bulk OUT and first bulk IN address out of an
    /// interface's endpoint list. Bit 7 of the address is the direction.
    pub fn pair<I>(endpoints: I) -> Option<Self>
    where
        I: IntoIterator<Item = (u8, bool)>,
    {
        let mut bulk_in = None;
        let mut bulk_out = None;

        for (address, is_bulk) in endpoints {
            if !is_bulk {
                log::debug!("skip endpoint {address:#04x}");
                continue;
            }

            if address & 0x80 != 0 {
                bulk_in.get_or_insert(address);
            } else {
                bulk_out.get_or_insert(address);
            }
        }

        match (bulk_out, bulk_in) {
            (Some(bulk_out), Some(bulk_in)) => Some(Self { bulk_out, bulk_in }),
            _ => None,
        }
    }
}

/// Transfer primitives the probes are built from.
///
/// Control requests are always vendor requests addressed to the device,
/// i.e. `bmRequestType` 0x40 for OUT and 0xc0 for IN.
pub trait Transport {
    fn endpoints(&self) -> Endpoints;

    fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<usize>;

    fn control_in(&mut self, request: u8, value: u16, index: u16, buf: &mut [u8])
    -> Result<usize>;

    fn bulk_out(&mut self, endpoint: u8, data: &[u8]) -> Result<usize>;

    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize>;

    fn clear_halt(&mut self, endpoint: u8) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn endpoints(&self) -> Endpoints {
        (**self).endpoints()
    }

    fn control_out(&mut self, request: u8, value: u16, index: u16, data: &[u8]) -> Result<usize> {
        (**self).control_out(request, value, index, data)
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
    ) -> Result<usize> {
        (**self).control_in(request, value, index, buf)
    }

    fn bulk_out(&mut self, endpoint: u8, data: &[u8]) -> Result<usize> {
        (**self).bulk_out(endpoint, data)
    }

    fn bulk_in(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize> {
        (**self).bulk_in(endpoint, buf)
    }

    fn clear_halt(&mut self, endpoint: u8) -> Result<()> {
        (**self).clear_halt(endpoint)
    }
}

/// A transport paired with the pacing used between probe steps.
///
/// The probes themselves live in [`crate::control`], [`crate::bulk`] and
/// [`crate::i2c`].
pub struct Session<T, D> {
    pub(crate) transport: T,
    pub(crate) delay: D,
    pub(crate) pause_ms: u32,
}

impl<T: Transport, D: DelayNs> Session<T, D> {
    pub fn new(transport: T, delay: D) -> Self {
        Self {
            transport,
            delay,
            pause_ms: PAUSE_MS,
        }
    }

    pub fn with_pause_ms(mut self, pause_ms: u32) -> Self {
        self.pause_ms = pause_ms;
        self
    }

    pub fn pause_ms(&self) -> u32 {
        self.pause_ms
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> (T, D) {
        (self.transport, self.delay)
    }

    pub(crate) fn pause(&mut self) {
        self.delay.delay_ms(self.pause_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_first_bulk_in_and_out() {
        let eps = Endpoints::pair([(0x83, false), (0x01, true), (0x81, true), (0x02, true)]);
        assert_eq!(
            eps,
            Some(Endpoints {
                bulk_out: 0x01,
                bulk_in: 0x81
            })
        );
    }

    #[test]
    fn missing_direction_yields_none() {
        assert_eq!(Endpoints::pair([(0x01, true), (0x82, false)]), None);
        assert_eq!(Endpoints::pair(std::iter::empty()), None);
    }

    #[test]
    fn default_matches_firmware_layout() {
        let eps = Endpoints::default();
        assert_eq!(eps.bulk_out, 0x01);
        assert_eq!(eps.bulk_in, 0x81);
    }
}
