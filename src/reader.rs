use crate::ExecErr;

/// Cursor over one received Query response packet.
pub struct PacketReader {
    bufs: Vec<u8>,
    current_idx: usize,
}

impl PacketReader {
    pub fn create_with_idx(bufs: Vec<u8>, current_idx: usize) -> Self {
        Self { bufs, current_idx }
    }

    pub fn set_current_idx_forward(&mut self, idx: usize) -> Result<(), ExecErr> {
        if self.current_idx + idx > self.bufs.len() {
            return Err(ExecErr::DataErr(format!(
                "Cannot skip {} bytes, only {} left in packet",
                idx,
                self.bufs.len() - self.current_idx
            )));
        }

        self.current_idx += idx;

        Ok(())
    }

    pub fn read(&mut self) -> Result<u8, ExecErr> {
        match self.bufs.get(self.current_idx) {
            Some(&buf) => {
                self.current_idx += 1;
                Ok(buf)
            }
            None => Err(ExecErr::DataErr("Incomplete data".into())),
        }
    }

    /// Little-endian port, as sent in the basic stat response.
    pub fn read_port(&mut self) -> Result<u16, ExecErr> {
        Ok(u16::from_le_bytes([self.read()?, self.read()?]))
    }

    /// Null-terminated string.
    pub fn read_nt_str(&mut self) -> Result<String, ExecErr> {
        let mut result = Vec::new();

        loop {
            match self.read()? {
                0x00 => break,
                buf => result.push(buf),
            }
        }

        Ok(decode_str(result))
    }

    /// Null-terminated strings until an empty one.
    pub fn read_nt_str_group(&mut self) -> Result<Vec<String>, ExecErr> {
        let mut str_group = Vec::new();

        loop {
            match self.read_nt_str()? {
                str if str.is_empty() => break,
                str => str_group.push(str),
            }
        }

        Ok(str_group)
    }
}

/// Servers usually send UTF-8, but plenty of `server.properties` files are
/// saved as ISO-8859-1 (`§`, `©`...).
fn decode_str(bufs: Vec<u8>) -> String {
    match String::from_utf8(bufs) {
        Ok(str) => str,
        Err(err) => err.into_bytes().into_iter().map(char::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_strings_ports_and_groups() {
        let mut reader = PacketReader::create_with_idx(
            b"\x00skipA MOTD\x00\xdd\x63hostname\x00Lobby\x00alice\x00bob\x00\x00".to_vec(),
            1,
        );

        reader.set_current_idx_forward(4).unwrap();
        assert_eq!(reader.read_nt_str().unwrap(), "A MOTD");
        assert_eq!(reader.read_port().unwrap(), 25565);
        assert_eq!(reader.read_nt_str().unwrap(), "hostname");
        assert_eq!(reader.read_nt_str().unwrap(), "Lobby");
        assert_eq!(reader.read_nt_str_group().unwrap(), vec!["alice", "bob"]);
        assert!(reader.read().is_err());
    }

    #[test]
    fn latin1_fallback() {
        let mut reader = PacketReader::create_with_idx(b"\xa7aHi\x00".to_vec(), 0);

        assert_eq!(reader.read_nt_str().unwrap(), "§aHi");
    }

    #[test]
    fn unterminated_string_is_incomplete() {
        let mut reader = PacketReader::create_with_idx(b"no end".to_vec(), 0);

        assert!(matches!(reader.read_nt_str(), Err(ExecErr::DataErr(_))));
        assert!(reader.set_current_idx_forward(10).is_err());
    }
}
