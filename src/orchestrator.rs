use crate::{
    query::{QueryConnector, QuerySession},
    ExecErr, ResolvedAddress,
};
use log::info;
use std::{io::Write, time::Duration};

/// Open one session to `target`, print the full status and then the basic
/// status to `out`.
///
/// The session is closed on every path once it has been opened. Any failure
/// after resolution is reported as a [ExecErr::QueryFailure] naming the target.
pub async fn run<C, W>(
    connector: &C,
    target: &ResolvedAddress,
    timeout_ms: u64,
    out: &mut W,
) -> Result<(), ExecErr>
where
    C: QueryConnector,
    W: Write,
{
    let mut session = connector
        .open(target, Duration::from_millis(timeout_ms))
        .await
        .map_err(|err| query_failure(target, err))?;

    info!("Querying {} with a {}ms timeout", target, timeout_ms);

    let result = query_statuses(&mut session, out).await;
    session.close();

    result.map_err(|err| query_failure(target, err))
}

async fn query_statuses<S, W>(session: &mut S, out: &mut W) -> Result<(), ExecErr>
where
    S: QuerySession,
    W: Write,
{
    let full = session.full_stat().await?;
    writeln!(out, "{}", full)?;

    let basic = session.basic_stat().await?;
    writeln!(out, "{}", basic)?;

    Ok(())
}

fn query_failure(target: &ResolvedAddress, cause: ExecErr) -> ExecErr {
    ExecErr::QueryFailure {
        target: target.to_string(),
        cause: Box::new(cause),
    }
}
