//! Build script so edits to the SQL migrations trigger a rebuild of the
//! embedded `sqlx::migrate!` set.

fn main() {
    println!("cargo:rerun-if-changed=migrations");
}
