/// Initial schema. Dates are stored as `YYYY-MM-DD` text so that text order
/// is date order; `scanned_at_ms` is Unix milliseconds (UTC).
pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE IF NOT EXISTS fare_observations (
  id                     INTEGER PRIMARY KEY AUTOINCREMENT,
  origin                 TEXT NOT NULL,
  destination            TEXT NOT NULL,
  date                   TEXT NOT NULL,
  oneway_price           REAL CHECK (oneway_price IS NULL OR oneway_price >= 0),
  oneway_departure_time  TEXT,
  oneway_arrival_time    TEXT,
  roundtrip_price        REAL CHECK (roundtrip_price IS NULL OR roundtrip_price >= 0),
  roundtrip_return_date  TEXT,
  airline                TEXT,
  scanned_at_ms          INTEGER NOT NULL,
  CHECK ((roundtrip_price IS NULL) = (roundtrip_return_date IS NULL)),
  UNIQUE (destination, date)
);

CREATE INDEX IF NOT EXISTS idx_fares_dest_scanned ON fare_observations(destination, scanned_at_ms);

CREATE TABLE IF NOT EXISTS subscriptions (
  id           INTEGER PRIMARY KEY AUTOINCREMENT,
  email        TEXT NOT NULL UNIQUE,
  destination  TEXT NOT NULL
);

COMMIT;
"#;
