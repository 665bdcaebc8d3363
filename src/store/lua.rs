//! Lua scripts backing the Redis store's compound operations.

// Moves one scheduled member into its destination queue. The push is
// guarded by the ZREM result, so of any number of concurrent promoters
// only the one that removed the member enqueues it.
//
// KEYS[1]: scheduled set
// KEYS[2]: destination queue (list)
// ARGV[1]: member payload
//
// Returns:
//   1 if this call moved the member
//   0 if the member was already gone
pub(crate) static PROMOTE_JOB_SCRIPT: &str = r#"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
if removed == 1 then
    redis.call('RPUSH', KEYS[2], ARGV[1])
end
return removed
"#;

// Lists scheduled members whose score is at or below the given instant.
//
// KEYS[1]: scheduled set
// ARGV[1]: now (unix milliseconds)
//
// Returns: due member payloads, earliest first.
pub(crate) static DUE_JOBS_SCRIPT: &str = r#"
return redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
"#;
