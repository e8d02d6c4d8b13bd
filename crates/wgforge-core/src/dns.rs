//! DNS List Generation
//!
//! Random dotted quads for the `DNS =` line. They are syntactically valid
//! but not real resolvers, and repeats are allowed.

use rand::Rng;
use std::net::Ipv4Addr;

/// Number of random resolvers appended after the primary one
pub const DEFAULT_DNS_COUNT: usize = 7;

/// Fixed first entry of every DNS line
pub const PRIMARY_DNS: Ipv4Addr = Ipv4Addr::new(10, 202, 10, 10);

/// Generate `n` random resolver addresses
///
/// First octet is drawn from 1..=255, last from 1..=254, the middle two
/// from the full byte range.
pub fn generate_dns_list<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Ipv4Addr> {
    (0..n)
        .map(|_| {
            Ipv4Addr::new(
                rng.gen_range(1..=255),
                rng.gen_range(0..=255),
                rng.gen_range(0..=255),
                rng.gen_range(1..=254),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_list_length() {
        let mut rng = rand::thread_rng();

        assert_eq!(generate_dns_list(DEFAULT_DNS_COUNT, &mut rng).len(), 7);
        assert_eq!(generate_dns_list(1, &mut rng).len(), 1);
        assert!(generate_dns_list(0, &mut rng).is_empty());
    }

    #[test]
    fn test_octet_bounds() {
        let mut rng = StdRng::seed_from_u64(11);

        for ip in generate_dns_list(5_000, &mut rng) {
            let [first, _, _, last] = ip.octets();
            assert!(first >= 1, "first octet zero in {}", ip);
            assert!((1..=254).contains(&last), "bad last octet in {}", ip);

            // Display form parses back to the same address
            assert_eq!(ip.to_string().parse::<Ipv4Addr>().unwrap(), ip);
        }
    }

    #[test]
    fn test_primary_resolver() {
        assert_eq!(PRIMARY_DNS.to_string(), "10.202.10.10");
    }
}
