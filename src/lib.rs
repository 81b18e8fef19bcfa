//! Validate an `<address:port>` argument, resolve it, and query a Minecraft
//! server's full and basic status over the [Query](https://wiki.vg/Query) protocol.

mod addr;
mod conf;
mod error;
pub mod orchestrator;
pub mod query;
mod reader;
mod resolve;
pub mod timeout;

pub use addr::{AddressSpec, HostKind};
pub use conf::{Cli, FileConf, DEFAULT_TIMEOUT_RAW};
pub use error::ExecErr;
pub use query::{
    ModPlugin, QueryBasic, QueryConnector, QueryFull, QuerySession, UdpQueryConnector,
    UdpQuerySession,
};
pub use resolve::{resolve, resolve_host, NameLookup, ResolvedAddress, SystemLookup};
pub use timeout::{resolve_timeout, TimeoutOption, DEFAULT_TIMEOUT_MS};

use std::io::Write;

/// Run the whole pipeline for an already validated address.
///
/// The timeout is resolved first and never fails, then the host is resolved
/// (fatal on failure), then both statuses are queried over one session.
///
/// # Example
///
/// ```no_run
/// use mqe::{AddressSpec, ExecErr, SystemLookup, TimeoutOption, UdpQueryConnector};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), ExecErr> {
///     let spec = AddressSpec::parse("mc.example.com:25565")?;
///     let timeout = TimeoutOption::Text("3000".into());
///
///     mqe::execute(
///         &SystemLookup,
///         &UdpQueryConnector,
///         &spec,
///         &timeout,
///         &mut std::io::stdout(),
///     )
///     .await
/// }
/// ```
pub async fn execute<L, C, W>(
    lookup: &L,
    connector: &C,
    spec: &AddressSpec,
    timeout_option: &TimeoutOption,
    out: &mut W,
) -> Result<(), ExecErr>
where
    L: NameLookup,
    C: QueryConnector,
    W: Write,
{
    let timeout_ms = resolve_timeout(timeout_option);
    let target = resolve(lookup, spec).await?;

    orchestrator::run(connector, &target, timeout_ms, out).await
}
