//! Server-side Lua scripts for the Redis backend.
//!
//! Every multi-key write is one script so that read-compute-write sequences
//! are atomic on the server; the client never does application-side
//! read-modify-write. Floats are written back with `%.17g`, which
//! round-trips an IEEE double exactly.

/// Create an experiment unless it already exists.
///
/// KEYS: params, arm-names, max-reward, choose-count, then one arm-state
/// key per arm. ARGV: field count, that many field/value pairs, then one
/// arm name per arm-state key. Returns 1 when created, 0 when the
/// experiment already existed.
pub const INIT_EXPERIMENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
local nfields = tonumber(ARGV[1])
local idx = 2
for _ = 1, nfields do
  redis.call('HSET', KEYS[1], ARGV[idx], ARGV[idx + 1])
  idx = idx + 2
end
local state = 5
while ARGV[idx] do
  redis.call('SADD', KEYS[2], ARGV[idx])
  redis.call('HSET', KEYS[state], 'n', '1', 'mean-reward', '0', 'deleted', '0')
  idx = idx + 1
  state = state + 1
end
redis.call('SET', KEYS[3], '1')
redis.call('SET', KEYS[4], '0')
return 1
"#;

/// Add an arm, or clear its soft-delete flag keeping accumulated state.
///
/// KEYS: params, arm-names, arm-state. ARGV: arm name. Returns 0 when the
/// experiment does not exist.
pub const CREATE_ARM: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
redis.call('SADD', KEYS[2], ARGV[1])
if redis.call('HEXISTS', KEYS[3], 'n') == 1 then
  redis.call('HSET', KEYS[3], 'deleted', '0')
else
  redis.call('HSET', KEYS[3], 'n', '1', 'mean-reward', '0', 'deleted', '0')
end
return 1
"#;

/// Flag an arm deleted while keeping its state.
///
/// KEYS: arm-names, arm-state. ARGV: arm name.
pub const SOFT_DELETE_ARM: &str = r#"
if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 0 then
  return 0
end
redis.call('HSET', KEYS[2], 'deleted', '1')
return 1
"#;

/// Remove an arm and its state permanently.
///
/// KEYS: arm-names, arm-state. ARGV: arm name.
pub const HARD_DELETE_ARM: &str = r#"
redis.call('SREM', KEYS[1], ARGV[1])
redis.call('DEL', KEYS[2])
return 1
"#;

/// Apply one reward observation (scale-and-update).
///
/// KEYS: arm-names, arm-state, max-reward.
/// ARGV: arm name, lower bound, reward.
/// Returns 0 when the arm is not in the arm-name set (never created or
/// hard-deleted); soft-deleted arms still accumulate.
pub const RECORD_REWARD: &str = r#"
if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 0 then
  return 0
end
local lower = tonumber(ARGV[2])
local reward = tonumber(ARGV[3])
local n = tonumber(redis.call('HGET', KEYS[2], 'n') or '1')
local mean = tonumber(redis.call('HGET', KEYS[2], 'mean-reward') or '0')
local max = tonumber(redis.call('GET', KEYS[3]) or '1')
local clamped = math.max(reward, lower)
max = math.max(max, clamped)
local scaled
if max == lower then
  scaled = lower
else
  scaled = (clamped - lower) / (max - lower)
end
n = n + 1
mean = mean + (scaled - mean) / n
redis.call('HSET', KEYS[2], 'n', tostring(n), 'mean-reward', string.format('%.17g', mean))
redis.call('SET', KEYS[3], string.format('%.17g', max))
return 1
"#;

/// Merge a pre-aggregated reward batch (parallel mean merge).
///
/// KEYS: arm-names, arm-state, max-reward.
/// ARGV: arm name, lower bound, batch mean, batch max, batch count.
pub const BULK_REWARD: &str = r#"
if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 0 then
  return 0
end
local lower = tonumber(ARGV[2])
local batch_mean = math.max(tonumber(ARGV[3]), lower)
local batch_max = math.max(tonumber(ARGV[4]), lower)
local count = tonumber(ARGV[5])
local n = tonumber(redis.call('HGET', KEYS[2], 'n') or '1')
local mean = tonumber(redis.call('HGET', KEYS[2], 'mean-reward') or '0')
local max = tonumber(redis.call('GET', KEYS[3]) or '1')
max = math.max(max, batch_max)
local scaled
if max == lower then
  scaled = lower
else
  scaled = (batch_mean - lower) / (max - lower)
end
n = n + count
mean = mean + (scaled - mean) * (count / n)
redis.call('HSET', KEYS[2], 'n', tostring(n), 'mean-reward', string.format('%.17g', mean))
redis.call('SET', KEYS[3], string.format('%.17g', max))
return 1
"#;
