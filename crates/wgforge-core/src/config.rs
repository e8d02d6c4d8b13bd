//! Config Rendering
//!
//! Composes key material, sampled addresses and a DNS list into a
//! WireGuard-style `.conf` document.

use crate::address::sample_address;
use crate::dns::{generate_dns_list, DEFAULT_DNS_COUNT, PRIMARY_DNS};
use crate::keys::{KeyError, KeyMaterial};
use crate::region::{Country, IpRangeTable, RegionError};
use rand::{CryptoRng, Rng};
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use tracing::debug;

/// Interface MTU written into every document
pub const MTU: u16 = 1483;

/// Peer keepalive interval (seconds)
pub const PERSISTENT_KEEPALIVE: u16 = 47;

/// Prefix length appended to the interface address
pub const ADDRESS_PREFIX: u8 = 24;

/// Range the peer endpoint port is drawn from
pub const ENDPOINT_PORTS: RangeInclusive<u16> = 10000..=65000;

/// Range of the numeric suffix in generated file names
const FILE_SUFFIXES: RangeInclusive<u32> = 10000..=99999;

/// Peer endpoint (IPv4 + UDP port)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// IP address
    pub addr: Ipv4Addr,
    /// UDP port
    pub port: u16,
}

impl Endpoint {
    /// Create a new endpoint
    pub fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// A generated configuration
///
/// Immutable once built. `Display` produces the `.conf` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    /// `[Interface] PrivateKey`
    pub private_key: KeyMaterial,
    /// `[Interface] Address` (written with a /24 suffix)
    pub address: Ipv4Addr,
    /// `[Interface] DNS`, primary resolver first
    pub dns: Vec<Ipv4Addr>,
    /// `[Peer] PublicKey`
    pub public_key: KeyMaterial,
    /// `[Peer] PresharedKey`
    pub preshared_key: KeyMaterial,
    /// `[Peer] Endpoint`
    pub endpoint: Endpoint,
}

impl ConfigDocument {
    /// Render the `.conf` text
    pub fn to_conf(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dns = self
            .dns
            .iter()
            .map(Ipv4Addr::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "[Interface]")?;
        writeln!(f, "PrivateKey = {}", self.private_key)?;
        writeln!(f, "Address = {}/{}", self.address, ADDRESS_PREFIX)?;
        writeln!(f, "DNS = {}", dns)?;
        writeln!(f, "MTU = {}", MTU)?;
        writeln!(f)?;
        writeln!(f, "[Peer]")?;
        writeln!(f, "PublicKey = {}", self.public_key)?;
        writeln!(f, "PresharedKey = {}", self.preshared_key)?;
        writeln!(f, "Endpoint = {}", self.endpoint)?;
        writeln!(f, "PersistentKeepalive = {}", PERSISTENT_KEEPALIVE)
    }
}

/// Generator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Random resolvers after the primary one
    pub dns_count: usize,
    /// First resolver on the DNS line
    pub primary_dns: Ipv4Addr,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            dns_count: DEFAULT_DNS_COUNT,
            primary_dns: PRIMARY_DNS,
        }
    }
}

/// Builds [`ConfigDocument`]s from a range table
///
/// Stateless apart from the borrowed table; share one across tasks and pass
/// each call its own random source.
#[derive(Debug, Clone)]
pub struct ConfigGenerator<'a> {
    table: &'a IpRangeTable,
    options: GeneratorOptions,
}

impl<'a> ConfigGenerator<'a> {
    /// Create a generator with default options
    pub fn new(table: &'a IpRangeTable) -> Self {
        Self::with_options(table, GeneratorOptions::default())
    }

    /// Create a generator with explicit options
    pub fn with_options(table: &'a IpRangeTable, options: GeneratorOptions) -> Self {
        Self { table, options }
    }

    /// Generate a document for a country name
    ///
    /// The name is resolved before `rng` is touched, so an unknown country
    /// consumes no randomness.
    pub fn generate<R: Rng + CryptoRng + ?Sized>(
        &self,
        country: &str,
        rng: &mut R,
    ) -> Result<ConfigDocument, GenerateError> {
        let country = self.table.resolve(country)?;
        self.generate_for(country, rng)
    }

    /// Generate a document for an already resolved country
    pub fn generate_for<R: Rng + CryptoRng + ?Sized>(
        &self,
        country: &Country,
        rng: &mut R,
    ) -> Result<ConfigDocument, GenerateError> {
        let private_key = KeyMaterial::generate(rng)?;
        let public_key = KeyMaterial::generate(rng)?;
        let preshared_key = KeyMaterial::generate(rng)?;

        let address = sample_address(country, rng)?;

        let mut dns = Vec::with_capacity(self.options.dns_count + 1);
        dns.push(self.options.primary_dns);
        dns.extend(generate_dns_list(self.options.dns_count, rng));

        let endpoint_ip = sample_address(country, rng)?;
        let endpoint_port = rng.gen_range(ENDPOINT_PORTS);

        debug!(
            "Generated config for {} (address {}, endpoint {}:{})",
            country.name(),
            address,
            endpoint_ip,
            endpoint_port
        );

        Ok(ConfigDocument {
            private_key,
            address,
            dns,
            public_key,
            preshared_key,
            endpoint: Endpoint::new(endpoint_ip, endpoint_port),
        })
    }

    /// Render `.conf` text using the thread-local CSPRNG
    pub fn render(&self, country: &str) -> Result<String, GenerateError> {
        self.generate(country, &mut rand::thread_rng())
            .map(|doc| doc.to_conf())
    }
}

/// Render a document for a country in the built-in table
pub fn render(country: &str) -> Result<String, GenerateError> {
    ConfigGenerator::new(&IpRangeTable::builtin()).render(country)
}

/// File name for a stored config: `wg_<country>_<5 digits>.conf`
pub fn config_file_name<R: Rng + ?Sized>(country: &Country, rng: &mut R) -> String {
    format!(
        "wg_{}_{}.conf",
        country.name().to_lowercase(),
        rng.gen_range(FILE_SUFFIXES)
    )
}

/// Generation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl GenerateError {
    /// Whether the caller asked for a country that is not configured
    pub fn is_unknown_country(&self) -> bool {
        matches!(self, GenerateError::Region(RegionError::UnknownCountry(_)))
    }
}
