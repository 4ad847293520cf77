use std::path::{
    Path,
    PathBuf,
};

fn pid_to_path(pid: Option<u32>) -> String {
    pid.as_ref().map(ToString::to_string).unwrap_or(String::from("self"))
}

pub fn proc_pid_maps_path(pid: Option<u32>) -> PathBuf {
    Path::new("/").join("proc").join(pid_to_path(pid)).join("maps")
}

pub fn proc_pid_mem_path(pid: Option<u32>) -> PathBuf {
    Path::new("/").join("proc").join(pid_to_path(pid)).join("mem")
}

pub fn proc_pid_status_path(pid: Option<u32>) -> PathBuf {
    Path::new("/").join("proc").join(pid_to_path(pid)).join("status")
}

pub fn proc_pid_exe_path(pid: Option<u32>) -> PathBuf {
    Path::new("/").join("proc").join(pid_to_path(pid)).join("exe")
}
