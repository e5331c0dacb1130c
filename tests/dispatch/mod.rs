use std::fs;
use std::io::{self, Cursor, Write};
use std::num::NonZeroUsize;
use std::path::Path;

use pcap_slicer::dispatch::CHUNK_SIZE;
use pcap_slicer::{
    write_fragment_stream, CommandTemplate, DispatchError, Dispatcher, ExecMode, Fragment, FragmentPlan,
    FragmentPlanner, GlobalHeader, Parallelism, SliceError, StreamError,
};

const CAPTURE: &str = "tests/big_endian.pcap";

fn fixture_plan(count: usize) -> FragmentPlan {
    FragmentPlanner::open(CAPTURE, 3600).unwrap().plan(count).unwrap()
}

fn fixed(n: usize) -> Parallelism {
    Parallelism::Fixed(NonZeroUsize::new(n).unwrap())
}

/// Checks that `file` holds the standalone capture of `fragment`.
fn assert_fragment_file(file: &Path, source: &[u8], fragment: &Fragment) {
    let written = fs::read(file).unwrap();
    let (start, end) = (fragment.offset as usize, fragment.end() as usize);

    assert_eq!(written.len(), 24 + (end - start), "{}", file.display());
    assert_eq!(&written[..24], &source[..24]);
    assert_eq!(&written[24..], &source[start..end]);
}

fn source_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn fragment_stream() {
    let source = source_bytes(1000);
    let fragment = Fragment { index: 0, offset: 100, size: 50 };

    let mut stream = Vec::new();
    let written = write_fragment_stream(&mut Cursor::new(&source), &GlobalHeader::default(), &fragment, &mut stream).unwrap();

    assert_eq!(written, 74);
    assert_eq!(stream.len(), 74);
    assert_eq!(hex::encode(&stream[..24]), "a1b2c3d40002000400000000000000000000ffff00000001");
    assert_eq!(&stream[24..], &source[100..150]);
}

#[test]
fn fragment_stream_spans_chunks() {
    let source = source_bytes(3 * CHUNK_SIZE + 123);
    let fragment = Fragment { index: 0, offset: 7, size: (source.len() - 7) as u64 };

    let mut stream = Vec::new();
    let written = write_fragment_stream(&mut Cursor::new(&source), &GlobalHeader::default(), &fragment, &mut stream).unwrap();

    assert_eq!(written, 24 + fragment.size);
    assert_eq!(&stream[24..], &source[7..]);
}

#[test]
fn fragment_stream_short_read() {
    let source = source_bytes(1000);
    let fragment = Fragment { index: 2, offset: 900, size: 200 };

    let mut stream = Vec::new();
    let err = write_fragment_stream(&mut Cursor::new(&source), &GlobalHeader::default(), &fragment, &mut stream).unwrap_err();

    match err {
        StreamError::ShortRead { offset, expected, got } => assert_eq!((offset, expected, got), (900, 200, 100)),
        other => panic!("unexpected error {other:?}"),
    }
}

struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn fragment_stream_write_failed() {
    let source = source_bytes(100);
    let fragment = Fragment { index: 0, offset: 0, size: 100 };

    let err = write_fragment_stream(&mut Cursor::new(&source), &GlobalHeader::default(), &fragment, &mut ClosedPipe).unwrap_err();
    assert!(matches!(err, StreamError::WriteFailed(e) if e.kind() == io::ErrorKind::BrokenPipe));
}

#[test]
fn every_fragment_reaches_its_command() {
    let source = fs::read(CAPTURE).unwrap();
    let plan = fixture_plan(4);

    for parallelism in [1, 2, 8] {
        let dir = tempfile::tempdir().unwrap();
        let out = format!("{}/part{{FRAGMENT_INDEX}}.pcap", dir.path().display());
        let template = CommandTemplate::new(["cat", ">", out.as_str()]);

        let report = Dispatcher::new(CAPTURE, template)
            .with_parallelism(fixed(parallelism))
            .dispatch(&plan);

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.total(), 4);

        for (run, fragment) in report.completed.iter().zip(&plan) {
            assert_eq!(run.index, fragment.index);
            assert_eq!(run.bytes_written, 24 + fragment.size);
            assert_eq!(run.command, format!("cat > {}/part{}.pcap", dir.path().display(), fragment.index));
            assert_fragment_file(&dir.path().join(format!("part{}.pcap", fragment.index)), &source, fragment);
        }
    }
}

#[test]
fn dispatcher_settings() {
    let dispatcher = Dispatcher::new(CAPTURE, CommandTemplate::new(["cat"]));
    assert_eq!(dispatcher.path(), Path::new(CAPTURE));
    assert_eq!(dispatcher.parallelism(), Parallelism::Auto.resolve());

    let dispatcher = dispatcher.with_parallelism(fixed(3));
    assert_eq!(dispatcher.parallelism().get(), 3);
}

/// No more than `parallelism` commands are alive at once, the other fragments wait.
#[test]
fn parallelism_is_a_cap() {
    let plan = fixture_plan(8);
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().display();

    let script = format!(
        "touch {dir}/run{{FRAGMENT_INDEX}}; ls {dir} | grep -c '^run' >> {dir}/samples; \
         sleep 0.2; cat > /dev/null; rm {dir}/run{{FRAGMENT_INDEX}}"
    );
    let report = Dispatcher::new(CAPTURE, CommandTemplate::new([script]))
        .with_parallelism(fixed(3))
        .dispatch(&plan);
    assert!(report.is_success(), "{:?}", report.failures);

    let samples = fs::read_to_string(format!("{dir}/samples")).unwrap();
    let counts: Vec<usize> = samples.lines().map(|line| line.trim().parse().unwrap()).collect();

    assert_eq!(counts.len(), 8);
    assert!(counts.iter().all(|&count| (1..=3).contains(&count)), "{counts:?}");
}

#[test]
fn offset_and_size_placeholders() {
    let source = fs::read(CAPTURE).unwrap();
    let plan = fixture_plan(3);
    let dir = tempfile::tempdir().unwrap();

    let out = format!("{}/{{OFFSET}}-{{SIZE}}.pcap", dir.path().display());
    let report = Dispatcher::new(CAPTURE, CommandTemplate::new(["cat", ">", out.as_str()]))
        .with_parallelism(fixed(3))
        .dispatch(&plan);
    assert!(report.is_success(), "{:?}", report.failures);

    for fragment in &plan {
        let file = dir.path().join(format!("{}-{}.pcap", fragment.offset, fragment.size));
        assert_fragment_file(&file, &source, fragment);
    }
}

/// One failing command does not prevent the others from completing.
#[test]
fn failures_are_isolated() {
    let source = fs::read(CAPTURE).unwrap();
    let plan = fixture_plan(4);
    let dir = tempfile::tempdir().unwrap();

    let script = format!(
        "if [ {{FRAGMENT_INDEX}} -eq 1 ]; then pcap-slicer-no-such-program; else cat > {}/part{{FRAGMENT_INDEX}}.pcap; fi",
        dir.path().display()
    );
    let report = Dispatcher::new(CAPTURE, CommandTemplate::new([script]))
        .with_parallelism(fixed(2))
        .dispatch(&plan);

    assert_eq!(report.total(), 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index(), 1);
    // Exiting (127) without reading stdin may also break the pipe first
    assert!(matches!(
        report.failures[0],
        DispatchError::ExitStatus { .. } | DispatchError::Stream { .. }
    ));

    let completed: Vec<_> = report.completed.iter().map(|run| run.index).collect();
    assert_eq!(completed, [0, 2, 3]);
    for fragment in plan.fragments().iter().filter(|f| f.index != 1) {
        assert_fragment_file(&dir.path().join(format!("part{}.pcap", fragment.index)), &source, fragment);
    }
    assert!(!dir.path().join("part1.pcap").exists());

    match report.into_result() {
        Err(SliceError::Dispatch { failures, total }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(total, 4);
        },
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn exit_status() {
    let plan = fixture_plan(2);
    let template = CommandTemplate::new(["cat > /dev/null; exit 1"]);

    let report = Dispatcher::new(CAPTURE, template).dispatch(&plan);

    assert!(report.completed.is_empty());
    assert_eq!(report.failures.len(), 2);
    for (index, failure) in report.failures.iter().enumerate() {
        match failure {
            DispatchError::ExitStatus { index: i, command, status } => {
                assert_eq!(*i, index);
                assert_eq!(command, "cat > /dev/null; exit 1");
                assert_eq!(status.code(), Some(1));
            },
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[test]
fn empty_command() {
    let plan = fixture_plan(2);

    for mode in [ExecMode::Shell, ExecMode::Direct] {
        let report = Dispatcher::new(CAPTURE, CommandTemplate::new(Vec::<String>::new()))
            .with_exec_mode(mode)
            .dispatch(&plan);

        assert_eq!(report.failures.len(), 2);
        assert!(report.failures.iter().all(|e| matches!(e, DispatchError::EmptyCommand { .. })));
    }
}

#[test]
fn direct_execution() {
    let source = fs::read(CAPTURE).unwrap();
    let plan = fixture_plan(2);
    let dir = tempfile::tempdir().unwrap();

    // The tokens reach the program as they are, `>` would not be a redirection
    let out = format!("cat > {}/direct{{FRAGMENT_INDEX}}.pcap", dir.path().display());
    let report = Dispatcher::new(CAPTURE, CommandTemplate::new(["sh", "-c", out.as_str()]))
        .with_exec_mode(ExecMode::Direct)
        .dispatch(&plan);
    assert!(report.is_success(), "{:?}", report.failures);

    for fragment in &plan {
        assert_fragment_file(&dir.path().join(format!("direct{}.pcap", fragment.index)), &source, fragment);
    }

    let report = Dispatcher::new(CAPTURE, CommandTemplate::new(["pcap-slicer-no-such-program", "{OFFSET}"]))
        .with_exec_mode(ExecMode::Direct)
        .dispatch(&plan);
    assert_eq!(report.failures.len(), 2);
    for failure in &report.failures {
        match failure {
            DispatchError::Spawn { command, .. } => assert!(command.starts_with("pcap-slicer-no-such-program ")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

/// The capture is opened before anything is spawned.
#[test]
fn missing_capture() {
    let plan = fixture_plan(2);
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");

    let touch = format!("touch {}", marker.display());
    let report = Dispatcher::new(dir.path().join("gone.pcap"), CommandTemplate::new([touch]))
        .dispatch(&plan);

    assert_eq!(report.failures.len(), 2);
    assert!(report.failures.iter().all(|e| matches!(e, DispatchError::Open { .. })));
    assert!(!marker.exists());
}
