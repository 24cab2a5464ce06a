//! Participant detection

use pc_protocol::ParticipantId;

/// Hostname fragments that identify each device
const SNAPDRAGON_HINTS: [&str; 3] = ["snapdragon", "samsung", "galaxy"];
const INTEL_HINTS: [&str; 3] = ["intel", "lenovo", "yoga"];

/// Guess which participant this machine is
pub fn detect_participant() -> ParticipantId {
    let hostname = gethostname::gethostname().to_string_lossy().to_lowercase();
    let participant = participant_for(std::env::consts::ARCH, &hostname);
    tracing::debug!(
        "Detected {} (arch {}, host {})",
        participant,
        std::env::consts::ARCH,
        hostname
    );
    participant
}

/// ARM machines are the Snapdragon; otherwise the hostname may say so.
/// Anything else is the Intel participant.
pub fn participant_for(arch: &str, hostname: &str) -> ParticipantId {
    let arch = arch.to_lowercase();
    if arch.contains("aarch64") || arch.contains("arm") {
        return ParticipantId::Snapdragon;
    }

    let hostname = hostname.to_lowercase();
    if SNAPDRAGON_HINTS.iter().any(|hint| hostname.contains(hint)) {
        return ParticipantId::Snapdragon;
    }
    if INTEL_HINTS.iter().any(|hint| hostname.contains(hint)) {
        return ParticipantId::Intel;
    }

    ParticipantId::Intel
}
