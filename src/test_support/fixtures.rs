//! Test fixtures for common test scenarios.

use std::path::{Path, PathBuf};

/// A dump with one target and a single `Release` configuration.
pub const SAMPLE_DUMP: &str = r#"# resolved build description
{'included_files': ['libtgvoip.gyp', 'libtgvoip.gypi'],
 'targets': [{'configurations': {'Release': {'defines': ['HAVE_X', 'VER=2'],
                                             'libraries': ['ssl']}},
              'default_configuration': 'Release',
              'sources': ['VoIPController.cpp', 'NetworkSocket.cpp'],
              'target_name': 'libtgvoip',
              'toolset': 'target',
              'type': 'static_library'}]}
"#;

/// A dump with both configurations, as the generator writes it for a
/// library built in either mode.
pub const TWO_CONFIG_DUMP: &str = r#"{'targets': [{'target_name': 'libtgvoip',
  'type': 'static_library',
  'libraries': ['-lpthread'],
  'configurations': {
    'Debug': {'defines': ['TGVOIP_USE_CALLBACK_AUDIO_IO', 'WEBRTC_APM_DEBUG_DUMP=0', '_DEBUG'],
              'libraries': ['ssl', 'crypto']},
    'Release': {'defines': ['TGVOIP_USE_CALLBACK_AUDIO_IO', 'WEBRTC_APM_DEBUG_DUMP=0', 'NDEBUG'],
                'libraries': ['ssl', 'crypto']}}}]}
"#;

/// A complete manifest for the sample project layout.
pub const SAMPLE_MANIFEST: &str = r#"
[package]
name = "pytgcalls"

[library]
name = "libtgvoip"
path = "share/libtgvoip"

[generator]
script = "share/gyp/gyp_main.py"

[bindings]
interface = "swig/libtgvoip.i"

[extension]
name = "_libtgvoip"
sources = ["swig/libtgvoip.i"]

[[dependencies]]
reference = "OpenSSL/latest_1.1.1x@conan/stable"
options = { no_zlib = true }

[[dependencies]]
reference = "opus/[~=1.2.1]@bincrafters/stable"

[[dependencies]]
reference = "ninja/1.9.0@bincrafters/stable"
kind = "executable"
"#;

/// Write `content` as a dump file in `dir`.
pub fn write_dump(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("libtgvoip.gypd");
    std::fs::write(&path, content).expect("write dump fixture");
    path
}

/// Shell stand-in for the build-file generator.
///
/// Mirrors where the real generator writes: the ninja backend puts
/// `build.ninja` under `<toplevel-dir>/<generator-output>/<config>/`, the
/// dump backend writes `dump` next to the build description. Each call
/// appends `gyp <format> <PATH>` to `log`.
pub fn generator_script(dump: &str, log: &Path) -> String {
    format!(
        r#"for a in "$@"; do
  case "$a" in
    --toplevel-dir=*) top="${{a#--toplevel-dir=}}" ;;
    --generator-output=*) out="${{a#--generator-output=}}" ;;
    --format=*) fmt="${{a#--format=}}" ;;
  esac
  desc="$a"
done
echo "gyp $fmt $PATH" >> '{log}'
if [ "$fmt" = ninja ]; then
  for config in Debug Release; do
    mkdir -p "$top/$out/$config" && echo 'rule cc' > "$top/$out/$config/build.ninja"
  done
else
  cat > "${{desc%.gyp}}.gypd" <<'EOF'
{dump}EOF
fi
"#,
        log = log.display(),
        dump = dump,
    )
}

/// Lay out the sample project under `dir` and return the manifest path.
pub fn write_project(dir: &Path) -> PathBuf {
    let files = [
        ("Extforge.toml", SAMPLE_MANIFEST),
        ("share/libtgvoip/libtgvoip.gyp", "{'targets': []}\n"),
        ("share/libtgvoip/libtgvoip.gypi", "{}\n"),
        ("share/gyp/gyp_main.py", "# generator entry point\n"),
        ("swig/libtgvoip.i", "%module libtgvoip\n"),
    ];

    for (relative, content) in files {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(&path, content).expect("write fixture file");
    }

    dir.join("Extforge.toml")
}
