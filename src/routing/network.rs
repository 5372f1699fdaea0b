use crate::routing::types::PrimaryInterface;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("Windows API error: {0}")]
    WindowsApi(String),
    #[error("no active IPv4 interface with a gateway was found")]
    NoInterfaceFound,
    #[error("interface \"{0}\" is not present")]
    InterfaceNotPresent(String),
}

pub type Result<T> = std::result::Result<T, InterfaceError>;

/// Where adapter snapshots come from. The system implementation asks the OS;
/// tests substitute a fixed adapter.
pub trait InterfaceSource {
    fn find_primary(&self) -> Result<PrimaryInterface>;
    fn find_by_alias(&self, alias: &str) -> Result<PrimaryInterface>;
}

#[derive(Debug, Clone)]
struct AdapterInfo {
    name: String,
    index: u32,
    is_up: bool,
    is_loopback: bool,
    has_ipv4: bool,
    gateway: Option<std::net::Ipv4Addr>,
}

impl AdapterInfo {
    fn into_interface(self) -> PrimaryInterface {
        PrimaryInterface {
            alias: self.name,
            index: self.index,
            gateway: self.gateway,
        }
    }
}

pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    /// First adapter in enumeration order that is up, non-loopback and has
    /// both an IPv4 address and an IPv4 gateway. On multi-homed hosts the
    /// result depends on adapter order, same as the OS enumeration itself.
    fn find_primary(&self) -> Result<PrimaryInterface> {
        enumerate_adapters()?
            .into_iter()
            .find(|a| a.is_up && !a.is_loopback && a.has_ipv4 && a.gateway.is_some())
            .map(AdapterInfo::into_interface)
            .ok_or(InterfaceError::NoInterfaceFound)
    }

    fn find_by_alias(&self, alias: &str) -> Result<PrimaryInterface> {
        enumerate_adapters()?
            .into_iter()
            .find(|a| a.name.eq_ignore_ascii_case(alias))
            .map(AdapterInfo::into_interface)
            .ok_or_else(|| InterfaceError::InterfaceNotPresent(alias.to_string()))
    }
}

#[cfg(target_os = "windows")]
fn enumerate_adapters() -> Result<Vec<AdapterInfo>> {
    use windows::Win32::NetworkManagement::IpHelper::{
        GetAdaptersAddresses, GAA_FLAG_INCLUDE_GATEWAYS, GAA_FLAG_SKIP_ANYCAST,
        GAA_FLAG_SKIP_DNS_SERVER, GAA_FLAG_SKIP_MULTICAST, IP_ADAPTER_ADDRESSES_LH,
    };
    use windows::Win32::Networking::WinSock::{AF_UNSPEC, SOCKADDR_IN};

    const AF_INET: u16 = 2;
    const IF_TYPE_SOFTWARE_LOOPBACK: u32 = 24;
    const ERROR_BUFFER_OVERFLOW: u32 = 111;

    let flags = GAA_FLAG_SKIP_ANYCAST
        | GAA_FLAG_SKIP_MULTICAST
        | GAA_FLAG_SKIP_DNS_SERVER
        | GAA_FLAG_INCLUDE_GATEWAYS;

    let mut buffer_size: u32 = 15000;
    let mut buffer: Vec<u8> = vec![0; buffer_size as usize];

    let mut adapters = Vec::new();

    unsafe {
        let mut result = GetAdaptersAddresses(
            AF_UNSPEC.0 as u32,
            flags,
            None,
            Some(buffer.as_mut_ptr() as *mut IP_ADAPTER_ADDRESSES_LH),
            &mut buffer_size,
        );

        if result == ERROR_BUFFER_OVERFLOW {
            buffer = vec![0; buffer_size as usize];
            result = GetAdaptersAddresses(
                AF_UNSPEC.0 as u32,
                flags,
                None,
                Some(buffer.as_mut_ptr() as *mut IP_ADAPTER_ADDRESSES_LH),
                &mut buffer_size,
            );
        }

        if result != 0 {
            return Err(InterfaceError::WindowsApi(format!(
                "GetAdaptersAddresses failed with code {}",
                result
            )));
        }

        let mut current = buffer.as_ptr() as *const IP_ADAPTER_ADDRESSES_LH;

        while !current.is_null() {
            let adapter = &*current;

            let name = if !adapter.FriendlyName.is_null() {
                let len = (0..)
                    .take_while(|&i| *adapter.FriendlyName.0.offset(i) != 0)
                    .count();
                let slice = std::slice::from_raw_parts(adapter.FriendlyName.0, len);
                String::from_utf16_lossy(slice)
            } else {
                "Unknown".to_string()
            };

            let mut has_ipv4 = false;
            let mut unicast = adapter.FirstUnicastAddress;
            while !unicast.is_null() {
                let addr = &*unicast;
                if !addr.Address.lpSockaddr.is_null() {
                    let sockaddr = &*addr.Address.lpSockaddr;
                    if sockaddr.sa_family.0 == AF_INET {
                        let ipv4 = &*(addr.Address.lpSockaddr as *const SOCKADDR_IN);
                        if ipv4.sin_addr.S_un.S_addr != 0 {
                            has_ipv4 = true;
                        }
                    }
                }
                unicast = addr.Next;
            }

            let mut gateway = None;
            let mut gateway_addr = adapter.FirstGatewayAddress;
            while !gateway_addr.is_null() && gateway.is_none() {
                let addr = &*gateway_addr;
                if !addr.Address.lpSockaddr.is_null() {
                    let sockaddr = &*addr.Address.lpSockaddr;
                    if sockaddr.sa_family.0 == AF_INET {
                        let ipv4 = &*(addr.Address.lpSockaddr as *const SOCKADDR_IN);
                        gateway = Some(std::net::Ipv4Addr::from(
                            ipv4.sin_addr.S_un.S_addr.to_ne_bytes(),
                        ));
                    }
                }
                gateway_addr = addr.Next;
            }

            adapters.push(AdapterInfo {
                name,
                index: adapter.Anonymous1.Anonymous.IfIndex,
                is_up: adapter.OperStatus.0 == 1,
                is_loopback: adapter.IfType == IF_TYPE_SOFTWARE_LOOPBACK,
                has_ipv4,
                gateway,
            });

            current = adapter.Next;
        }
    }

    Ok(adapters)
}

#[cfg(not(target_os = "windows"))]
fn enumerate_adapters() -> Result<Vec<AdapterInfo>> {
    Err(InterfaceError::WindowsApi(
        "Not supported on this platform".to_string(),
    ))
}
