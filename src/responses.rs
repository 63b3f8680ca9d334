use atat::atat_derive::AtatResp;
use atat::heapless_bytes::Bytes;

/// Commands which gets just responded by OK
#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Response of CIPDOMAIN command
#[derive(Clone, AtatResp, Debug)]
pub struct DomainResponse {
    /// Resolved IP address. Quoted by newer firmware versions.
    pub address: Bytes<64>,
}

impl DomainResponse {
    /// Returns the address without surrounding quotes
    pub fn unquoted(&self) -> &[u8] {
        let address = self.address.as_slice();

        match address {
            [b'"', inner @ .., b'"'] => inner,
            _ => address,
        }
    }
}
