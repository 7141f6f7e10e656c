
use crate::AcqError;

/// Moves the calling thread to SCHED_FIFO at the given priority (1-99)
#[cfg(target_os = "linux")]
pub fn set_current_thread_priority(priority:i32) -> Result<(), AcqError> {
	if !(1..=99).contains(&priority) {
		return Err(AcqError::Priority(format!("priority {} outside 1-99", priority)));
	}

	let ret = unsafe {
		let mut param:libc::sched_param = std::mem::zeroed();
		param.sched_priority = priority;
		libc::sched_setscheduler(0, libc::SCHED_FIFO, &param)
	};
	if ret != 0 {
		return Err(AcqError::Priority(format!("sched_setscheduler failed: {}", std::io::Error::last_os_error())));
	}

	Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_current_thread_priority(_priority:i32) -> Result<(), AcqError> {
	Err(AcqError::Priority("real-time scheduling is only supported on Linux".to_string()))
}
