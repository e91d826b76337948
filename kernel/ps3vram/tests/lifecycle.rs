use geom::{errno, Bio, BioCmd, DiskOps};
use log::Level;
use lv1_abi::Lv1Error;
use parking_lot::RawMutex;
use pmap::PAGESIZE;
use ps3_sim::{DiskHandle, SimDisks, SimLogger, SimLv1, SimPmap, SIM_LPAR_BASE};
use ps3vram::config::MIB;
use ps3vram::{ModuleError, ModuleEvent, Phase, Ps3Vram, Ps3VramModule, VramConfig};

static LOGGER: SimLogger = SimLogger::new(Level::Info);

type SimVram = Ps3Vram<SimLv1, SimPmap, DiskHandle, RawMutex>;
type SimModule = Ps3VramModule<SimLv1, SimPmap, SimDisks, RawMutex>;

fn sim(vram_size: u64) -> (SimLv1, SimPmap) {
    let config = VramConfig::DEFAULT;
    (
        SimLv1::new(vram_size),
        SimPmap::new(
            SIM_LPAR_BASE,
            vram_size,
            config.window_base,
            config.max_transfer,
        ),
    )
}

#[test]
fn granted_size_steps_down_to_what_the_hypervisor_allows() {
    let _ = LOGGER.install();
    let (hv, pmap) = sim(256 * MIB);
    let hv = hv.with_grant_limit(253 * MIB);
    let mut disks = SimDisks::default();

    let config = VramConfig::DEFAULT.validate().unwrap();
    let vram = SimVram::attach(config, hv, pmap, &mut disks);

    assert_eq!(vram.region().size(), 253 * MIB);
    assert_eq!(vram.region().lpar(), SIM_LPAR_BASE);
    assert_eq!(disks.registered()[0].mediasize, 253 * MIB);
    assert_eq!(disks.registered()[0].sectors(), 253 * MIB / PAGESIZE as u64);
    assert!(LOGGER.contains("ddr_size = 253 MiB (265289728 Bytes)"));

    let (hv, _) = vram.detach(&mut disks);
    assert_eq!(
        hv.attempts(),
        vec![256 * MIB, 255 * MIB, 254 * MIB, 253 * MIB]
    );
    assert_eq!(hv.outstanding(), 0);
}

#[test]
#[should_panic(expected = "ps3vram: allocate gpu memory failed!")]
fn attaching_without_any_memory_halts() {
    let (hv, pmap) = sim(16 * MIB);
    let config = VramConfig::DEFAULT
        .with_preferred_size(16 * MIB)
        .validate()
        .unwrap();
    SimVram::attach(
        config,
        hv.with_grant_limit(0),
        pmap,
        &mut SimDisks::default(),
    );
}

#[test]
#[should_panic(expected = "ps3vram: free gpu memory failed!")]
fn refused_free_halts() {
    let (hv, pmap) = sim(16 * MIB);
    let config = VramConfig::DEFAULT
        .with_preferred_size(16 * MIB)
        .validate()
        .unwrap();
    let mut disks = SimDisks::default();
    let vram = SimVram::attach(
        config,
        hv.with_failing_free(Lv1Error::Busy),
        pmap,
        &mut disks,
    );
    vram.detach(&mut disks);
}

#[test]
#[should_panic(expected = "free gpu memory failed! (err = -12")]
fn refused_free_reports_the_raw_status() {
    let (hv, pmap) = sim(16 * MIB);
    let config = VramConfig::DEFAULT
        .with_preferred_size(16 * MIB)
        .validate()
        .unwrap();
    let mut disks = SimDisks::default();
    let vram = SimVram::attach(
        config,
        hv.with_failing_free(Lv1Error::Unknown(-12)),
        pmap,
        &mut disks,
    );
    vram.detach(&mut disks);
}

#[test]
fn module_follows_load_and_unload_events() {
    let _ = LOGGER.install();
    let (hv, pmap) = sim(32 * MIB);
    let config = VramConfig::DEFAULT.with_preferred_size(32 * MIB);
    let mut module = SimModule::new(config, hv, pmap, SimDisks::default()).unwrap();

    let mut buf = [0u8; PAGESIZE];
    let mut bio = Bio::new(BioCmd::READ, 0, &mut buf);
    module.strategy(&mut bio);
    assert_eq!(bio.error, errno::ENXIO);

    module.handle_event(ModuleEvent::Load).unwrap();
    assert_eq!(module.phase(), Phase::Ready);
    assert!(LOGGER.contains("ps3vram_init()"));
    assert!(LOGGER.contains("ps3vram0 ready"));

    let mut buf = [0x77u8; PAGESIZE];
    let mut bio = Bio::new(BioCmd::WRITE, 31 * MIB, &mut buf);
    module.strategy(&mut bio);
    assert_eq!(bio.error, 0);

    assert_eq!(
        module.handle_event(ModuleEvent::Quiesce).map_err(|e| e.errno()),
        Err(errno::EOPNOTSUPP)
    );
    assert_eq!(
        module.handle_event(ModuleEvent::Load),
        Err(ModuleError::AlreadyLoaded)
    );

    module.handle_event(ModuleEvent::Unload).unwrap();
    assert_eq!(module.phase(), Phase::Unloaded);
    assert!(module.registry().registered().is_empty());
    assert!(LOGGER.contains("ps3vram0 destroyed"));

    // unloading hands the capabilities back so the module can be loaded again
    module.handle_event(ModuleEvent::Load).unwrap();
    let mut buf = [0u8; PAGESIZE];
    let mut bio = Bio::new(BioCmd::READ, 31 * MIB, &mut buf);
    module.strategy(&mut bio);
    assert_eq!(bio.error, 0);
    module.handle_event(ModuleEvent::Unload).unwrap();
}
