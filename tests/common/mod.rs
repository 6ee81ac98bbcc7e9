//! Shared helpers for integration tests.
//!
//! `FakeRedis` is an in-memory [`Executor`] implementing the set commands
//! with server semantics, so the client can be exercised without a live
//! server. Members are kept sorted, which makes `SPOP`, `SRANDMEMBER` and
//! `SSCAN` deterministic.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use redset::{
    BatchFuture, Command, Executor, RedsetError, ReplyFuture, RespValue, Result, SetClient,
};

static TEST_ID: AtomicUsize = AtomicUsize::new(0);

/// Unique key prefix per test.
pub fn test_prefix() -> String {
    let id = TEST_ID.fetch_add(1, Ordering::Relaxed);
    format!("redset_test_{}_{}", std::process::id(), id)
}

pub fn b(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

pub fn sorted(mut members: Vec<Bytes>) -> Vec<Bytes> {
    members.sort();
    members
}

#[derive(Default)]
struct Store {
    sets: BTreeMap<Bytes, BTreeSet<Bytes>>,
    strings: BTreeMap<Bytes, Bytes>,
}

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

impl Store {
    fn set(&self, key: &Bytes) -> std::result::Result<Option<&BTreeSet<Bytes>>, String> {
        if self.strings.contains_key(key) {
            return Err(WRONGTYPE.into());
        }
        Ok(self.sets.get(key))
    }

    fn set_mut(&mut self, key: &Bytes) -> std::result::Result<&mut BTreeSet<Bytes>, String> {
        if self.strings.contains_key(key) {
            return Err(WRONGTYPE.into());
        }
        Ok(self.sets.entry(key.clone()).or_default())
    }

    /// Drop a key whose set became empty, as the server does.
    fn prune(&mut self, key: &Bytes) {
        if self.sets.get(key).is_some_and(BTreeSet::is_empty) {
            self.sets.remove(key);
        }
    }

    fn combine(
        &self,
        keys: &[Bytes],
        op: fn(&BTreeSet<Bytes>, &BTreeSet<Bytes>) -> BTreeSet<Bytes>,
    ) -> std::result::Result<BTreeSet<Bytes>, String> {
        let empty = BTreeSet::new();
        let mut iter = keys.iter();
        let first = match iter.next() {
            Some(k) => self.set(k)?.unwrap_or(&empty).clone(),
            None => return Err("ERR wrong number of arguments".into()),
        };
        iter.try_fold(first, |acc, k| Ok(op(&acc, self.set(k)?.unwrap_or(&empty))))
    }

    fn store(&mut self, dest: &Bytes, result: BTreeSet<Bytes>) -> RespValue {
        let n = result.len() as i64;
        self.strings.remove(dest);
        if result.is_empty() {
            self.sets.remove(dest);
        } else {
            self.sets.insert(dest.clone(), result);
        }
        RespValue::Integer(n)
    }

    fn apply(&mut self, args: &[Bytes]) -> std::result::Result<RespValue, String> {
        let name = String::from_utf8_lossy(&args[0]).to_ascii_uppercase();
        let rest = &args[1..];
        let arity = |min: usize| {
            if rest.len() < min {
                Err(format!(
                    "ERR wrong number of arguments for '{}' command",
                    name.to_ascii_lowercase()
                ))
            } else {
                Ok(())
            }
        };

        match name.as_str() {
            "SADD" => {
                arity(2)?;
                let set = self.set_mut(&rest[0])?;
                let added = rest[1..].iter().filter(|m| set.insert((*m).clone())).count();
                Ok(RespValue::Integer(added as i64))
            }
            "SREM" => {
                arity(2)?;
                let key = &rest[0];
                let removed = if self.set(key)?.is_some() {
                    let set = self.set_mut(key)?;
                    rest[1..].iter().filter(|m| set.remove(*m)).count()
                } else {
                    0
                };
                self.prune(key);
                Ok(RespValue::Integer(removed as i64))
            }
            "SCARD" => {
                arity(1)?;
                Ok(RespValue::Integer(self.set(&rest[0])?.map_or(0, |s| s.len()) as i64))
            }
            "SISMEMBER" => {
                arity(2)?;
                let hit = self.set(&rest[0])?.is_some_and(|s| s.contains(&rest[1]));
                Ok(RespValue::Integer(hit as i64))
            }
            "SMEMBERS" => {
                arity(1)?;
                Ok(array(self.set(&rest[0])?.into_iter().flatten().cloned()))
            }
            "SMOVE" => {
                arity(3)?;
                let (src, dst, member) = (&rest[0], &rest[1], &rest[2]);
                self.set(dst)?;
                if !self.set(src)?.is_some_and(|s| s.contains(member)) {
                    return Ok(RespValue::Integer(0));
                }
                self.set_mut(src)?.remove(member);
                self.prune(src);
                self.set_mut(dst)?.insert(member.clone());
                Ok(RespValue::Integer(1))
            }
            "SPOP" => {
                arity(1)?;
                let key = &rest[0];
                let count = rest.get(1).map(parse_int).transpose()?;
                if count.is_some_and(|n| n < 0) {
                    return Err("ERR value is out of range, must be positive".into());
                }
                if self.set(key)?.is_none() {
                    return Ok(match count {
                        Some(_) => RespValue::Array(vec![]),
                        None => RespValue::Null,
                    });
                }
                let set = self.set_mut(key)?;
                let popped: Vec<Bytes> = match count {
                    Some(n) => (0..n).map_while(|_| set.pop_first()).collect(),
                    None => set.pop_first().into_iter().collect(),
                };
                self.prune(key);
                Ok(match count {
                    Some(_) => array(popped),
                    None => popped
                        .into_iter()
                        .next()
                        .map_or(RespValue::Null, RespValue::BulkString),
                })
            }
            "SRANDMEMBER" => {
                arity(1)?;
                let members: Vec<Bytes> =
                    self.set(&rest[0])?.into_iter().flatten().cloned().collect();
                match rest.get(1).map(parse_int).transpose()? {
                    None => Ok(members
                        .into_iter()
                        .next()
                        .map_or(RespValue::Null, RespValue::BulkString)),
                    Some(n) if n >= 0 => Ok(array(members.into_iter().take(n as usize))),
                    Some(n) => Ok(array(
                        members.iter().cycle().take(n.unsigned_abs() as usize).cloned(),
                    )),
                }
            }
            "SDIFF" | "SINTER" | "SUNION" => {
                arity(1)?;
                Ok(array(self.combine(rest, op_for(&name))?))
            }
            "SDIFFSTORE" | "SINTERSTORE" | "SUNIONSTORE" => {
                arity(2)?;
                let result = self.combine(&rest[1..], op_for(&name[..name.len() - 5]))?;
                Ok(self.store(&rest[0], result))
            }
            "SSCAN" => {
                arity(2)?;
                self.sscan(rest)
            }
            other => Err(format!("ERR unknown command '{other}'")),
        }
    }

    /// Cursor is an offset into the sorted members.
    fn sscan(&self, rest: &[Bytes]) -> std::result::Result<RespValue, String> {
        let cursor: usize = std::str::from_utf8(&rest[1])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or("ERR invalid cursor")?;
        let mut pattern: Option<Bytes> = None;
        let mut count = 10usize;
        for pair in rest[2..].chunks(2) {
            let [flag, value] = pair else {
                return Err("ERR syntax error".into());
            };
            match flag.to_ascii_uppercase().as_slice() {
                b"MATCH" => pattern = Some(value.clone()),
                b"COUNT" => {
                    let n = parse_int(value)?;
                    if n < 1 {
                        return Err("ERR syntax error".into());
                    }
                    count = n as usize;
                }
                _ => return Err("ERR syntax error".into()),
            }
        }

        let members: Vec<&Bytes> = self.set(&rest[0])?.into_iter().flatten().collect();
        let end = (cursor + count).min(members.len());
        let page = members
            .get(cursor..end)
            .unwrap_or_default()
            .iter()
            .filter(|m| pattern.as_ref().map_or(true, |p| glob_match(p, m)))
            .map(|m| (*m).clone());
        let next = if end >= members.len() { 0 } else { end };
        Ok(RespValue::Array(vec![
            RespValue::BulkString(b(&next.to_string())),
            array(page),
        ]))
    }
}

fn op_for(name: &str) -> fn(&BTreeSet<Bytes>, &BTreeSet<Bytes>) -> BTreeSet<Bytes> {
    match name {
        "SDIFF" => difference,
        "SINTER" => intersection,
        _ => union,
    }
}

fn difference(a: &BTreeSet<Bytes>, b: &BTreeSet<Bytes>) -> BTreeSet<Bytes> {
    a.difference(b).cloned().collect()
}

fn intersection(a: &BTreeSet<Bytes>, b: &BTreeSet<Bytes>) -> BTreeSet<Bytes> {
    a.intersection(b).cloned().collect()
}

fn union(a: &BTreeSet<Bytes>, b: &BTreeSet<Bytes>) -> BTreeSet<Bytes> {
    a.union(b).cloned().collect()
}

fn parse_int(raw: &Bytes) -> std::result::Result<i64, String> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| "ERR value is not an integer or out of range".to_string())
}

fn array(members: impl IntoIterator<Item = Bytes>) -> RespValue {
    RespValue::Array(members.into_iter().map(RespValue::BulkString).collect())
}

/// Glob with `*` and `?` only.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

/// In-memory set server behind the [`Executor`] trait.
#[derive(Clone, Default)]
pub struct FakeRedis {
    store: Arc<Mutex<Store>>,
    sent: Arc<Mutex<Vec<Command>>>,
    batches: Arc<AtomicUsize>,
    /// When set, the next batch fails as a whole with a timeout.
    fail_next_batch: Arc<Mutex<bool>>,
}

impl FakeRedis {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client over a clone of this server, sharing its data.
    pub fn client(&self) -> SetClient<FakeRedis> {
        SetClient::with_executor(self.clone())
    }

    /// Store a string value, so set commands on `key` answer `WRONGTYPE`.
    pub fn set_string(&self, key: &str, value: &str) {
        let mut store = self.store.lock();
        store.sets.remove(key.as_bytes());
        store.strings.insert(b(key), b(value));
    }

    pub fn members(&self, key: &str) -> Vec<Bytes> {
        let store = self.store.lock();
        store
            .sets
            .get(key.as_bytes())
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn exists(&self, key: &str) -> bool {
        let store = self.store.lock();
        store.sets.contains_key(key.as_bytes()) || store.strings.contains_key(key.as_bytes())
    }

    /// Commands received so far, direct and batched.
    pub fn sent(&self) -> Vec<Command> {
        self.sent.lock().clone()
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn fail_next_batch(&self) {
        *self.fail_next_batch.lock() = true;
    }

    fn run(&self, command: &Command) -> Result<RespValue> {
        self.sent.lock().push(command.clone());
        self.store
            .lock()
            .apply(command.args_slice())
            .map_err(RedsetError::redis)
    }
}

impl Executor for FakeRedis {
    fn execute(&self, command: Command) -> ReplyFuture {
        let reply = self.run(&command);
        Box::pin(async move { reply })
    }

    fn pipeline(&self, commands: Vec<Command>) -> BatchFuture {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if std::mem::take(&mut *self.fail_next_batch.lock()) {
            return Box::pin(async { Err(RedsetError::Timeout("batch not sent".into())) });
        }
        let replies: Vec<Result<RespValue>> = commands.iter().map(|c| self.run(c)).collect();
        Box::pin(async move { Ok(replies) })
    }
}

// ── TCP front end ──────────────────────────────────────────────────

impl FakeRedis {
    fn reply_to(&self, args: Vec<Bytes>) -> RespValue {
        match self.store.lock().apply(&args) {
            Ok(reply) => reply,
            Err(msg) => RespValue::Error(msg),
        }
    }
}

fn encode_reply(value: &RespValue, out: &mut Vec<u8>) {
    match value {
        RespValue::Integer(n) => out.extend_from_slice(format!(":{n}\r\n").as_bytes()),
        RespValue::BulkString(data) => {
            out.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
            out.extend_from_slice(data);
            out.extend_from_slice(b"\r\n");
        }
        RespValue::Null => out.extend_from_slice(b"$-1\r\n"),
        RespValue::Error(msg) => out.extend_from_slice(format!("-{msg}\r\n").as_bytes()),
        RespValue::SimpleString(s) => out.extend_from_slice(format!("+{s}\r\n").as_bytes()),
        RespValue::Array(items) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_reply(item, out);
            }
        }
        other => panic!("fake server cannot encode {other:?}"),
    }
}

/// Serve `server` over RESP on a loopback port; returns `host:port`.
///
/// `AUTH` and `SELECT` are accepted and answered `+OK`.
pub async fn serve(server: FakeRedis) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let server = server.clone();
            tokio::spawn(async move {
                let mut buf: Vec<u8> = Vec::new();
                let mut chunk = vec![0u8; 4096];
                loop {
                    let n = match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);

                    let mut out = Vec::new();
                    while let Ok((value, consumed)) = redset::resp::parse_slice(&buf) {
                        buf.drain(..consumed);
                        let args: Vec<Bytes> = value
                            .into_elements()
                            .unwrap_or_default()
                            .into_iter()
                            .filter_map(RespValue::into_bytes)
                            .collect();
                        let reply = match args.first().map(|a| a.to_ascii_uppercase()) {
                            Some(name) if name == b"AUTH" || name == b"SELECT" => {
                                RespValue::SimpleString("OK".into())
                            }
                            _ => server.reply_to(args),
                        };
                        encode_reply(&reply, &mut out);
                    }
                    if socket.write_all(&out).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}
