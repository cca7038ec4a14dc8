pub const SCHEMA: &str = r#"
-- Gallery nodes: one row per directory below the gallery root
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    depth INTEGER NOT NULL,
    path TEXT NOT NULL,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    hash TEXT NOT NULL,

    -- Metadata decoded from the directory name
    captured_at TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    event TEXT NOT NULL DEFAULT '',
    location TEXT NOT NULL DEFAULT '',
    city TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_path ON nodes(path);
CREATE INDEX IF NOT EXISTS idx_nodes_updated_at ON nodes(updated_at);

-- Images: one row per source photo
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    depth INTEGER NOT NULL,
    path TEXT NOT NULL,
    name TEXT NOT NULL,
    parent TEXT NOT NULL,  -- nodes.path, joined at export time

    -- Derivative identifiers (content addresses of path + tier salt)
    small TEXT NOT NULL,
    medium TEXT NOT NULL,
    large TEXT NOT NULL,

    exif INTEGER NOT NULL DEFAULT 0,

    -- Dimensions, 0 until known
    width INTEGER NOT NULL DEFAULT 0,
    height INTEGER NOT NULL DEFAULT 0,
    large_width INTEGER NOT NULL DEFAULT 0,
    large_height INTEGER NOT NULL DEFAULT 0,
    medium_width INTEGER NOT NULL DEFAULT 0,
    medium_height INTEGER NOT NULL DEFAULT 0,
    small_width INTEGER NOT NULL DEFAULT 0,
    small_height INTEGER NOT NULL DEFAULT 0,

    -- EXIF data
    captured_at TEXT NOT NULL DEFAULT '',
    fstop TEXT NOT NULL DEFAULT '',
    exposure_time TEXT NOT NULL DEFAULT '',
    iso_speed TEXT NOT NULL DEFAULT '',
    exposure_bias TEXT NOT NULL DEFAULT '',
    flash TEXT NOT NULL DEFAULT '',
    metering_mode TEXT NOT NULL DEFAULT '',
    focal_length TEXT NOT NULL DEFAULT '',
    focal_length_35mm TEXT NOT NULL DEFAULT '',
    camera_make TEXT NOT NULL DEFAULT '',
    camera_model TEXT NOT NULL DEFAULT '',
    lens_make TEXT NOT NULL DEFAULT '',
    lens_model TEXT NOT NULL DEFAULT '',
    software TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    copyright TEXT NOT NULL DEFAULT '',
    gps TEXT NOT NULL DEFAULT '',
    gps_latitude REAL NOT NULL DEFAULT 0,
    gps_longitude REAL NOT NULL DEFAULT 0,
    gps_altitude REAL NOT NULL DEFAULT 0,

    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_images_path ON images(path);
CREATE INDEX IF NOT EXISTS idx_images_parent ON images(parent);
CREATE INDEX IF NOT EXISTS idx_images_updated_at ON images(updated_at);
CREATE INDEX IF NOT EXISTS idx_images_exif ON images(exif);
"#;
