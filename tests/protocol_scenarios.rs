// End-to-end scenarios against a loopback serial port, driven with a fake clock so the
// retry/dedup timers are exercised deterministically instead of racing real wall time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use llap_core::clock::FakeClock;
use llap_core::test_support::LoopbackPort;
use llap_core::{encode, Coordinator, DeviceId, EngineConfig, Message};

const POLL: Duration = Duration::from_millis(5);
const SETTLE: Duration = Duration::from_secs(1);

fn ab() -> DeviceId {
    DeviceId::from_str_exact("AB").unwrap()
}

fn frame(msg: &Message) -> Vec<u8> {
    encode(msg, b'a', b'-').unwrap().to_vec()
}

/// Poll `port.take_written()` until at least `n` frames have accumulated, or panic past
/// `SETTLE`. Returns every frame seen so far, concatenated in arrival order.
fn wait_for_frames(port: &LoopbackPort, collected: &mut Vec<u8>, n: usize) {
    let deadline = Instant::now() + SETTLE;
    while collected.len() < n * 12 {
        collected.extend(port.take_written());
        if collected.len() >= n * 12 {
            return;
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for {n} frame(s); got {} bytes", collected.len());
        }
        std::thread::sleep(POLL);
    }
}

fn nth_frame(bytes: &[u8], n: usize) -> &[u8] {
    &bytes[(n - 1) * 12..n * 12]
}

/// Advance the fake clock and give the retry handler's background thread a chance to observe
/// it on its next (real-time) scan tick.
fn tick_past_retry_interval(clock: &FakeClock, cfg: &EngineConfig) {
    clock.advance(cfg.retry_interval + Duration::from_millis(1));
    std::thread::sleep(cfg.retry_tick * 3);
}

#[test]
fn s1_sleep_closed_by_sleeping_with_no_further_retransmission() {
    let port = LoopbackPort::new();
    let probe = port.clone();
    let clock = FakeClock::new();
    let cfg = EngineConfig::default();
    let handle =
        Coordinator::start_with_clock(Box::new(port), cfg.clone(), Arc::new(clock.clone())).unwrap();

    handle.commands().send(Message::Sleep(ab())).unwrap();

    let mut written = Vec::new();
    wait_for_frames(&probe, &mut written, 1);
    assert_eq!(nth_frame(&written, 1), b"aABSLEEP----");

    // The device's own transport ack must not prematurely close the Sleep command — only a
    // distinguished Sleeping response does (§4.3 point 4, message::matches_response).
    probe.push_inbound(b"aABACK------");
    let event = handle.events().recv_timeout(SETTLE).unwrap();
    assert_eq!(event, Message::Ack(ab()));

    probe.push_inbound(b"aABSLEEPING-");
    let event = handle.events().recv_timeout(SETTLE).unwrap();
    assert_eq!(event, Message::Sleeping(ab()));

    // Sleeping does not require an ack (§4.1 table), so nothing further goes out, and the
    // pending Sleep entry is already closed: advancing well past the retry interval sends
    // nothing more.
    for _ in 0..3 {
        tick_past_retry_interval(&clock, &cfg);
    }
    written.extend(probe.take_written());
    assert_eq!(written.len(), 12, "Sleep is closed by Sleeping with no ack and no retransmit");

    handle.stop().unwrap();
}

#[test]
fn s2_retry_then_success() {
    let port = LoopbackPort::new();
    let probe = port.clone();
    let clock = FakeClock::new();
    let cfg = EngineConfig::default();
    let handle =
        Coordinator::start_with_clock(Box::new(port), cfg.clone(), Arc::new(clock.clone())).unwrap();

    handle.commands().send(Message::Reboot(ab())).unwrap();

    let mut written = Vec::new();
    wait_for_frames(&probe, &mut written, 1);
    assert_eq!(nth_frame(&written, 1), b"aABREBOOT---");

    tick_past_retry_interval(&clock, &cfg);
    wait_for_frames(&probe, &mut written, 2);
    assert_eq!(nth_frame(&written, 2), b"aABREBOOT---");

    tick_past_retry_interval(&clock, &cfg);
    wait_for_frames(&probe, &mut written, 3);
    assert_eq!(nth_frame(&written, 3), b"aABREBOOT---");

    probe.push_inbound(b"aABACK------");
    let event = handle.events().recv_timeout(SETTLE).unwrap();
    assert_eq!(event, Message::Ack(ab()));

    // Give the retry handler several more chances to fire; the command is already closed.
    for _ in 0..3 {
        tick_past_retry_interval(&clock, &cfg);
    }
    written.extend(probe.take_written());
    assert_eq!(written.len(), 3 * 12, "no retransmission after the ack closed the command");

    handle.stop().unwrap();
}

#[test]
fn s3_retry_exhaustion_then_s4_wake_flush() {
    let port = LoopbackPort::new();
    let probe = port.clone();
    let clock = FakeClock::new();
    let cfg = EngineConfig::default();
    let handle =
        Coordinator::start_with_clock(Box::new(port), cfg.clone(), Arc::new(clock.clone())).unwrap();

    handle.commands().send(Message::BatteryLow(ab())).unwrap();

    let mut written = Vec::new();
    wait_for_frames(&probe, &mut written, 1);

    // Five retries beyond the initial send: six frames total (§8 property 5).
    for expected in 2..=6 {
        tick_past_retry_interval(&clock, &cfg);
        wait_for_frames(&probe, &mut written, expected);
        assert_eq!(nth_frame(&written, expected), b"aABBATTLOW--");
    }

    // One more scan escalates retries==max_retries to unanswered without a seventh send.
    tick_past_retry_interval(&clock, &cfg);
    written.extend(probe.take_written());
    assert_eq!(written.len(), 6 * 12, "no 7th retransmission once retries are exhausted");

    // S4: an Awake for the device flushes the unanswered entry exactly once.
    probe.push_inbound(b"aABAWAKE----");
    let event = handle.events().recv_timeout(SETTLE).unwrap();
    assert_eq!(event, Message::Awake(ab()));

    wait_for_frames(&probe, &mut written, 7);
    assert_eq!(nth_frame(&written, 7), b"aABBATTLOW--");

    // The unanswered list no longer holds the entry: a second Awake flushes nothing.
    probe.push_inbound(b"aABAWAKE----");
    let event = handle.events().recv_timeout(SETTLE).unwrap();
    assert_eq!(event, Message::Awake(ab()));
    std::thread::sleep(Duration::from_millis(50));
    written.extend(probe.take_written());
    assert_eq!(written.len(), 7 * 12, "unanswered entry was drained by the first wake");

    handle.stop().unwrap();
}

#[test]
fn s5_duplicate_suppression_without_ack() {
    let port = LoopbackPort::new();
    let probe = port.clone();
    let clock = FakeClock::new();
    let handle =
        Coordinator::start_with_clock(Box::new(port), EngineConfig::default(), Arc::new(clock))
            .unwrap();

    probe.push_inbound(b"aABHELLO----");
    let event = handle.events().recv_timeout(SETTLE).unwrap();
    assert_eq!(event, Message::Hello(ab()));

    probe.push_inbound(b"aABHELLO----");
    let second = handle.events().recv_timeout(Duration::from_millis(200));
    assert!(second.is_err(), "duplicate Hello must not be re-published");

    let written = probe.take_written();
    assert!(written.is_empty(), "Hello does not require an ack");

    handle.stop().unwrap();
}

#[test]
fn s5_duplicate_suppression_with_ack_resent() {
    let port = LoopbackPort::new();
    let probe = port.clone();
    let clock = FakeClock::new();
    let handle =
        Coordinator::start_with_clock(Box::new(port), EngineConfig::default(), Arc::new(clock))
            .unwrap();

    probe.push_inbound(b"aABSTARTED--");
    let event = handle.events().recv_timeout(SETTLE).unwrap();
    assert_eq!(event, Message::Started(ab()));

    let mut written = Vec::new();
    wait_for_frames(&probe, &mut written, 1);
    assert_eq!(nth_frame(&written, 1), &frame(&Message::Ack(ab()))[..]);

    probe.push_inbound(b"aABSTARTED--");
    let second = handle.events().recv_timeout(Duration::from_millis(200));
    assert!(second.is_err(), "duplicate Started must not be re-published");

    wait_for_frames(&probe, &mut written, 2);
    assert_eq!(
        nth_frame(&written, 2),
        &frame(&Message::Ack(ab()))[..],
        "the ack is re-emitted for the retransmitted duplicate"
    );

    handle.stop().unwrap();
}

#[test]
fn s6_unparseable_frame_is_silently_dropped() {
    let port = LoopbackPort::new();
    let probe = port.clone();
    let clock = FakeClock::new();
    let handle =
        Coordinator::start_with_clock(Box::new(port), EngineConfig::default(), Arc::new(clock))
            .unwrap();

    probe.push_inbound(b"zABHELLO----");
    let event = handle.events().recv_timeout(Duration::from_millis(200));
    assert!(event.is_err(), "a bad start byte must not be published");

    let written = probe.take_written();
    assert!(written.is_empty(), "a dropped, unparseable frame is never acked");

    handle.stop().unwrap();
}
