//! Address Sampling
//!
//! Draws a uniformly random IPv4 address from one of a country's intervals.

use crate::region::{Country, RegionError};
use rand::seq::SliceRandom;
use rand::Rng;
use std::net::Ipv4Addr;

/// Pack the four octets big-endian into a `u32`
pub fn ip_to_int(ip: Ipv4Addr) -> u32 {
    u32::from_be_bytes(ip.octets())
}

/// Unpack a `u32` into dotted-quad form
pub fn int_to_ip(n: u32) -> Ipv4Addr {
    Ipv4Addr::from(n.to_be_bytes())
}

/// Sample an address for `country`
///
/// Picks one interval uniformly (regardless of its size), then a uniform
/// address inside it, both ends included.
pub fn sample_address<R: Rng + ?Sized>(
    country: &Country,
    rng: &mut R,
) -> Result<Ipv4Addr, RegionError> {
    let interval = country
        .ranges()
        .choose(rng)
        .ok_or_else(|| RegionError::EmptyCountry(country.name().to_string()))?;

    let start = ip_to_int(interval.start());
    let end = ip_to_int(interval.end());

    Ok(int_to_ip(rng.gen_range(start..=end)))
}
