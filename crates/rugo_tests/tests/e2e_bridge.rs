//! E2E: the native-package bridge wired through the whole pipeline.
//!
//! The local-package tests build a self-contained Go module in a temp
//! directory — the source inspector never needs the Go toolchain for
//! those. The stdlib tests (`import "strings"`, `import "encoding/hex"`)
//! resolve packages through `go list` and skip silently when no Go
//! toolchain is installed.

mod common;

use rugo_compile::{BuildOptions, Lockfile};
use std::fs;
use std::path::Path;

fn compile_in(dir: &Path, src: &str) -> Result<String, rugo_base::RugoError> {
    rugo_compile::compile_source("main.rugo", src, dir, Lockfile::default(), &BuildOptions::default())
        .map(|e| e.go_source)
}

fn write_go_module(dir: &Path, name: &str, gomod: &str, files: &[(&str, &str)]) {
    let pkg_dir = dir.join(name);
    fs::create_dir_all(&pkg_dir).unwrap();
    fs::write(pkg_dir.join("go.mod"), gomod).unwrap();
    for (file, src) in files {
        fs::write(pkg_dir.join(file), src).unwrap();
    }
}

#[test]
fn require_of_local_go_package_bridges_functions() {
    let tmp = tempfile::tempdir().unwrap();
    write_go_module(
        tmp.path(),
        "mathx",
        "module example.com/mathx\n\ngo 1.22\n",
        &[(
            "mathx.go",
            "package mathx\n\nfunc Double(n int) int { return n * 2 }\n",
        )],
    );
    let go = compile_in(tmp.path(), "require \"mathx\"\nputs mathx.double(21)\n").unwrap();
    assert!(go.contains("func rugoB_mathx_double(args ...any) any {"));
    assert!(go.contains("mathx.Double(rugoToInt(args[0]))"));
    assert!(go.contains("rugoB_mathx_double(21)"));
    // The emitted manifest work happens in go.mod synthesis, covered by
    // the driver; the import must be present here.
    assert!(go.contains("\"example.com/mathx\""));
}

#[test]
fn local_struct_bridges_with_handle_and_methods() {
    let tmp = tempfile::tempdir().unwrap();
    write_go_module(
        tmp.path(),
        "srv",
        "module example.com/srv\n\ngo 1.22\n",
        &[(
            "srv.go",
            "package srv\n\n\
             type Server struct {\n\tHost string\n\tPort int\n}\n\n\
             func (s *Server) Describe() string { return s.Host }\n\
             func Start(s *Server) error { return nil }\n",
        )],
    );
    let src = "require \"srv\"\ns = srv.server()\ns.host = \"x\"\nputs s.describe()\nsrv.start(s)\n";
    let go = compile_in(tmp.path(), src).unwrap();
    // Wrapper type with dot-get/set/call.
    assert!(go.contains("type RugoH_srv_Server struct { v *srv.Server }"));
    assert!(go.contains("func (h RugoH_srv_Server) rugoGet(name string) any {"));
    assert!(go.contains("func (h RugoH_srv_Server) rugoSet(name string, val any) {"));
    assert!(go.contains("h.v.Describe()"));
    // Zero-value constructor and the reclassified Start.
    assert!(go.contains("return RugoH_srv_Server{v: &srv.Server{}}"));
    assert!(go.contains("rugoB_srv_start(v_s)"));
    assert!(go.contains("rugoUnwrap_RugoH_srv_Server(args[0])"));
}

#[test]
fn dot_set_on_handle_lowers_through_rugo_dot_set() {
    let tmp = tempfile::tempdir().unwrap();
    write_go_module(
        tmp.path(),
        "cfg",
        "module example.com/cfg\n\ngo 1.22\n",
        &[(
            "cfg.go",
            "package cfg\n\ntype Options struct {\n\tDebug bool\n}\n",
        )],
    );
    let go = compile_in(tmp.path(), "require \"cfg\"\no = cfg.options()\no.debug = true\n").unwrap();
    assert!(go.contains("rugoDotSet(v_o, \"debug\", true)"));
}

#[test]
fn unknown_bridged_function_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    write_go_module(
        tmp.path(),
        "mathx",
        "module example.com/mathx\n\ngo 1.22\n",
        &[(
            "mathx.go",
            "package mathx\n\nfunc Double(n int) int { return n * 2 }\n",
        )],
    );
    let err = compile_in(tmp.path(), "require \"mathx\"\nputs mathx.triple(1)\n").unwrap_err();
    assert!(err.to_string().contains("unknown function 'mathx.triple'"));
}

#[test]
fn missing_go_mod_is_fatal_and_names_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let pkg_dir = tmp.path().join("bare");
    fs::create_dir_all(&pkg_dir).unwrap();
    fs::write(pkg_dir.join("bare.go"), "package bare\nfunc F() {}\n").unwrap();
    let err = compile_in(tmp.path(), "require \"bare\"\nputs bare.f()\n").unwrap_err();
    assert!(err.to_string().contains("no go.mod found above"));
}

#[test]
fn import_strings_cut_destructures() {
    if !rugo_bridge::go_toolchain_available() {
        return;
    }
    let src = "import \"strings\"\na, b, f = strings.cut(\"k=v\", \"=\")\nputs a\nputs b\nputs f\n";
    let go = common::emit(src);
    // Cut is (string, string, bool): a multi-return sequence.
    assert!(go.contains("func rugoB_strings_cut(args ...any) any {"));
    assert!(go.contains("strings.Cut(rugoToString(args[0]), rugoToString(args[1]))"));
    assert!(go.contains("return []any{r0, r1, r2}"));
    // Destructuring reads the three slots.
    assert!(go.contains("rugoIndex(v___destr0, 0)"));
    assert!(go.contains("rugoIndex(v___destr0, 2)"));
}

#[test]
fn import_hex_auto_wraps_encode() {
    if !rugo_bridge::go_toolchain_available() {
        return;
    }
    let go = common::emit("import \"encoding/hex\"\nputs hex.encode(\"hi\")\n");
    assert!(go.contains("dst := make([]byte, hex.EncodedLen(len(src)))"));
    assert!(go.contains("return string(dst[:n])"));
    assert!(go.contains("rugoB_hex_encode(\"hi\")"));
}
