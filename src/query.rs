use crate::{reader::PacketReader, ExecErr, ResolvedAddress};
use log::debug;
use serde::Serialize;
use std::{
    future::Future,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};
use tokio::net::UdpSocket;

const TOKEN_MASK: i32 = 0x0F0F0F0F;
const SESSION_ID: i32 = 1;
const MAGIC: [u8; 2] = [0xFE, 0xFD];
const HANDSHAKE_TYPE: u8 = 0x09;
const STAT_TYPE: u8 = 0x00;
const PADDING_BUFS: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
/// `splitnum\0\x80\0` in front of the full stat key/value section.
const FULL_STAT_PADDING: usize = 11;
/// `\x01player_\0\0` in front of the full stat player section.
const PLAYER_PADDING: usize = 10;
const MAX_PACKET_SIZE: usize = 65535;

/// Basic [status](https://wiki.vg/Query#Basic_stat).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryBasic {
    pub motd: String,
    pub game_type: String,
    pub map: String,
    pub numplayers: String,
    pub maxplayers: String,
    pub hostport: u16,
    pub hostip: String,
}

impl std::fmt::Display for QueryBasic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

/// Full [status](https://wiki.vg/Query#Full_stat).
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFull {
    pub hostname: String,
    pub gametype: String,
    pub game_id: String,
    pub version: String,
    pub plugins: Vec<ModPlugin>,
    pub map: String,
    pub numplayers: String,
    pub maxplayers: String,
    pub hostport: String,
    pub hostip: String,
    pub players: Vec<String>,
}

impl std::fmt::Display for QueryFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?
        )
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ModPlugin {
    pub mod_name: String,
    pub plugins: Vec<String>,
}

/// Opens query sessions against a resolved target.
pub trait QueryConnector {
    type Session: QuerySession;

    fn open(
        &self,
        target: &ResolvedAddress,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Session, ExecErr>>;
}

/// One connection to a Query enabled server.
///
/// `close` releases the connection and may be called any number of times.
pub trait QuerySession {
    fn full_stat(&mut self) -> impl Future<Output = Result<QueryFull, ExecErr>>;

    fn basic_stat(&mut self) -> impl Future<Output = Result<QueryBasic, ExecErr>>;

    fn close(&mut self);
}

/// Production connector, speaks the Query protocol over UDP.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpQueryConnector;

impl QueryConnector for UdpQueryConnector {
    type Session = UdpQuerySession;

    async fn open(
        &self,
        target: &ResolvedAddress,
        timeout: Duration,
    ) -> Result<Self::Session, ExecErr> {
        UdpQuerySession::open(target, timeout).await
    }
}

pub struct UdpQuerySession {
    socket: Option<UdpSocket>,
    timeout: Duration,
}

impl UdpQuerySession {
    /// Bind an ephemeral local port of the target's family and connect it.
    pub async fn open(target: &ResolvedAddress, timeout: Duration) -> Result<Self, ExecErr> {
        let peer = match tokio::net::lookup_host((target.ip.as_str(), target.port))
            .await?
            .next()
        {
            Some(peer) => peer,
            None => {
                return Err(ExecErr::DataErr(format!(
                    "{} can not parse into socket addr",
                    target
                )));
            }
        };
        let local: SocketAddr = match peer {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;

        debug!("Query socket {} connected to {}", socket.local_addr()?, peer);

        Ok(Self {
            socket: Some(socket),
            timeout,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    async fn exchange(&self, packet: &[u8]) -> Result<Vec<u8>, ExecErr> {
        let socket = match &self.socket {
            Some(socket) => socket,
            None => return Err(ExecErr::DataErr("Query session is already closed".into())),
        };
        let mut bufs = vec![0u8; MAX_PACKET_SIZE];

        tokio::time::timeout(self.timeout, socket.send(packet)).await??;
        let len = tokio::time::timeout(self.timeout, socket.recv(&mut bufs)).await??;
        bufs.truncate(len);

        debug!("Query sent {} bytes, received {} bytes", packet.len(), len);

        Ok(bufs)
    }

    /// Handshake, then a stat request carrying the challenge token.
    async fn send_query_request(&self, full_query: bool) -> Result<PacketReader, ExecErr> {
        let session_bufs = SESSION_ID.to_be_bytes();
        let handshake = [&MAGIC[..], &[HANDSHAKE_TYPE][..], &session_bufs[..]].concat();
        let token = get_challenge_token(&self.exchange(&handshake).await?)?;

        let stat_request = [
            &MAGIC[..],
            &[STAT_TYPE][..],
            &session_bufs[..],
            &token.to_be_bytes()[..],
            match full_query {
                true => PADDING_BUFS.as_slice(),
                false => [].as_slice(),
            },
        ]
        .concat();
        let bufs = self.exchange(&stat_request).await?;

        if bufs.first() != Some(&STAT_TYPE) {
            return Err(ExecErr::DataErr(format!(
                "Response packet invalid, expected start with 0x00, but got: {:?}",
                bufs.first()
            )));
        }

        check_session_id(&bufs)?;

        // Type and session id are not needed anymore
        Ok(PacketReader::create_with_idx(bufs, 5))
    }
}

impl QuerySession for UdpQuerySession {
    async fn full_stat(&mut self) -> Result<QueryFull, ExecErr> {
        let mut reader = self.send_query_request(true).await?;

        reader.set_current_idx_forward(FULL_STAT_PADDING)?;

        let mut full = QueryFull::default();

        loop {
            let (key, value) = match reader.read_nt_str()? {
                key if key.is_empty() => break,
                key => (key, reader.read_nt_str()?),
            };

            match key.as_str() {
                "hostname" => full.hostname = value,
                "gametype" => full.gametype = value,
                "game_id" => full.game_id = value,
                "version" => full.version = value,
                "plugins" => full.plugins = resolve_plugins(&value),
                "map" => full.map = value,
                "numplayers" => full.numplayers = value,
                "maxplayers" => full.maxplayers = value,
                "hostport" => full.hostport = value,
                "hostip" => full.hostip = value,
                _ => debug!("Ignoring unknown full stat key {}", key),
            }
        }

        reader.set_current_idx_forward(PLAYER_PADDING)?;
        full.players = reader.read_nt_str_group()?;

        Ok(full)
    }

    async fn basic_stat(&mut self) -> Result<QueryBasic, ExecErr> {
        let mut reader = self.send_query_request(false).await?;

        Ok(QueryBasic {
            motd: reader.read_nt_str()?,
            game_type: reader.read_nt_str()?,
            map: reader.read_nt_str()?,
            numplayers: reader.read_nt_str()?,
            maxplayers: reader.read_nt_str()?,
            hostport: reader.read_port()?,
            hostip: reader.read_nt_str()?,
        })
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("Query session closed");
        }
    }
}

fn check_session_id(bufs: &[u8]) -> Result<(), ExecErr> {
    let session_id = match bufs.get(1..5) {
        Some(id) => i32::from_be_bytes([id[0], id[1], id[2], id[3]]) & TOKEN_MASK,
        None => {
            return Err(ExecErr::DataErr(format!(
                "Query response packet too short, len: {}",
                bufs.len()
            )));
        }
    };

    if session_id != SESSION_ID {
        return Err(ExecErr::DataErr(format!(
            "Query session ID mismatch, expected: {}, but got: {}",
            SESSION_ID, session_id
        )));
    }

    Ok(())
}

/// Process query handshake response [packet](https://wiki.vg/Query#Response),
/// and get challenge token.
fn get_challenge_token(bufs: &[u8]) -> Result<i32, ExecErr> {
    if bufs.first() != Some(&HANDSHAKE_TYPE) {
        return Err(ExecErr::DataErr(format!(
            "Query handshake response packet invalid, expected start with 0x09, but got: {:?}",
            bufs.first()
        )));
    }

    check_session_id(bufs)?;

    let token_bufs = match bufs[5..].split(|&b| b == 0x00).next() {
        Some(token_bufs) if !token_bufs.is_empty() => token_bufs,
        _ => {
            return Err(ExecErr::DataErr(
                "Query handshake response carries no challenge token".into(),
            ));
        }
    };

    match std::str::from_utf8(token_bufs) {
        Ok(token_str) => token_str.parse::<i32>().map_err(|err| {
            ExecErr::DataErr(format!("Invalid challenge token {}: {}", token_str, err))
        }),
        Err(err) => Err(ExecErr::DataErr(err.to_string())),
    }
}

/// Plugin format: `[SERVER_MOD_NAME[: PLUGIN_NAME(; PLUGIN_NAME...)]]`
fn resolve_plugins(plugin_str: &str) -> Vec<ModPlugin> {
    if plugin_str.trim().is_empty() {
        return vec![];
    }

    match plugin_str.split_once(':') {
        Some((mod_name, plugins)) => vec![ModPlugin {
            mod_name: mod_name.trim().into(),
            plugins: plugins
                .split(';')
                .map(|x| x.trim())
                .filter(|x| !x.is_empty())
                .map(|x| x.into())
                .collect(),
        }],
        None => vec![ModPlugin {
            mod_name: plugin_str.trim().into(),
            plugins: vec![],
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_token_is_parsed_from_handshake() {
        let bufs = b"\x09\x00\x00\x00\x019513307\x00";

        assert_eq!(get_challenge_token(bufs).unwrap(), 9513307);
        assert_eq!(get_challenge_token(b"\x09\x00\x00\x00\x01-42\x00").unwrap(), -42);
    }

    #[test]
    fn handshake_is_validated() {
        assert!(get_challenge_token(b"\x00\x00\x00\x00\x0112\x00").is_err());
        assert!(get_challenge_token(b"\x09\x00\x00\x00\x0212\x00").is_err());
        assert!(get_challenge_token(b"\x09\x00\x00\x00\x01\x00").is_err());
        assert!(get_challenge_token(b"\x09\x00").is_err());
    }

    #[test]
    fn plugins_are_split_by_mod() {
        assert_eq!(resolve_plugins(""), vec![]);
        assert_eq!(
            resolve_plugins("CraftBukkit on Bukkit 1.2.5-R4.0: WorldEdit 5.3; CommandBook 2.1"),
            vec![ModPlugin {
                mod_name: "CraftBukkit on Bukkit 1.2.5-R4.0".into(),
                plugins: vec!["WorldEdit 5.3".into(), "CommandBook 2.1".into()],
            }]
        );
        assert_eq!(
            resolve_plugins("Paper"),
            vec![ModPlugin {
                mod_name: "Paper".into(),
                plugins: vec![],
            }]
        );
    }
}
