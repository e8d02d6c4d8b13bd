//! wgforge core - WireGuard-style config fabrication
//!
//! Builds `.conf` documents that look like WireGuard client configs for a
//! chosen country. Every value is random: the keys are 32 random bytes in
//! base64, the addresses are sampled from per-country IPv4 ranges and the
//! DNS list is made of arbitrary dotted quads.
//!
//! # Pipeline
//!
//! ```text
//!   country name
//!        │
//!        ▼
//!  ┌─────────────┐   resolve    ┌──────────────┐
//!  │ IpRangeTable│─────────────▶│   Country    │
//!  └─────────────┘              └──────┬───────┘
//!                                      │ sample_address (x2)
//!  KeyMaterial (x3) ──┐                ▼
//!  DNS list ──────────┼────▶ ConfigDocument ──▶ `.conf` text
//!  endpoint port ─────┘
//! ```
//!
//! # Not a VPN
//!
//! The private, public and preshared keys are three unrelated random blobs.
//! Nothing here derives Curve25519 keys, and the documents cannot bring up
//! a working tunnel.
//!
//! All randomness goes through a caller-supplied `Rng + CryptoRng`, so tests
//! can pass a seeded `StdRng`; the convenience entry points use the
//! thread-local generator and are safe to call from many tasks at once.

mod address;
mod config;
mod dns;
mod keys;
mod region;

pub use address::{int_to_ip, ip_to_int, sample_address};
pub use config::{
    config_file_name, render, ConfigDocument, ConfigGenerator, Endpoint, GenerateError, GeneratorOptions,
    ADDRESS_PREFIX, ENDPOINT_PORTS, MTU, PERSISTENT_KEEPALIVE,
};
pub use dns::{generate_dns_list, DEFAULT_DNS_COUNT, PRIMARY_DNS};
pub use keys::{generate_key, KeyError, KeyMaterial, KEY_LEN};
pub use region::{AddressInterval, Country, IpRangeTable, RegionError};
