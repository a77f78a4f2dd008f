#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Inbound socket frames, then the typed translation of anything that decodes.
    if let Some(frame) = lcu_link::protocol::decode_frame(text) {
        let _ = lcu_link::LcuEvent::from_frame(frame);
    }

    // Lockfiles are read from disk and may hold anything.
    let _ = lcu_link::credentials::parse_lockfile(text);
    let _ = lcu_link::credentials::parse_command_line(text);

    // Session snapshots arrive from both the socket and the backup poll.
    let _ = serde_json::from_str::<lcu_link::models::ChampSelectSession>(text);
});
