//! End-to-end checks through the guest import surface: a scripted guest
//! drives `call_import` the way the compiled site does, and the host side
//! answers effects the way the web frontend would.

use pretty_assertions::assert_eq;
use yorstory_bridge::overlay::TextNode;
use yorstory_bridge::testing::{
    OverlayOp, RecordingGuest, RecordingHost, TestImage, VecMemory, test_bridge,
};
use yorstory_bridge::{
    BridgeError, FrameDriver, GuestMemory, HostEffect, ImportId, InputEvent, TextureMetadata,
};

// ── Helpers ───────────────────────────────────────────────────────────

/// Guest memory with `strings` laid out back to back from address 0.
fn memory_with(strings: &[&str]) -> (VecMemory, Vec<[f64; 2]>) {
    let mem = VecMemory::new(4096);
    let mut ptr = 0u32;
    let mut refs = Vec::new();
    for s in strings {
        mem.write_bytes(ptr, s.as_bytes()).unwrap();
        refs.push([f64::from(ptr), s.len() as f64]);
        ptr += s.len() as u32;
    }
    (mem, refs)
}

fn text_nodes(ops: &[OverlayOp]) -> Vec<&TextNode> {
    ops.iter()
        .filter_map(|op| match op {
            OverlayOp::Text(_, node) => Some(node),
            _ => None,
        })
        .collect()
}

#[test]
fn direct_load_one_fetch_one_notification() {
    let (mem, refs) = memory_with(&["images/logo.png"]);
    let mut bridge = test_bridge();
    bridge.attach_memory(mem);

    let [p, l] = refs[0];
    let handle = bridge
        .call_import(ImportId::CreateAndLoadTexture, &[p, l, 33071.0, 9729.0])
        .unwrap()
        .unwrap();
    assert_eq!(handle, 0.0);

    let effects = bridge.take_effects();
    assert_eq!(effects.len(), 1);
    let HostEffect::FetchMetadata(meta_req) = &effects[0] else {
        panic!("expected metadata fetch, got {effects:?}");
    };
    assert_eq!(
        meta_req.url,
        "/webgl_png?path=images%2Flogo.png&chunkSizeMax=524288"
    );

    let meta = TextureMetadata::from_json(r#"{"width":256,"height":128,"chunkSize":0}"#).unwrap();
    bridge.texture_metadata_loaded(0, meta).unwrap();
    let effects = bridge.take_effects();
    assert_eq!(effects.len(), 1);
    let HostEffect::FetchImage(img_req) = &effects[0] else {
        panic!("expected image fetch, got {effects:?}");
    };
    assert_eq!(img_req.url, "images/logo.png");

    let ready = bridge
        .texture_image_loaded(0, None, TestImage::new(256, 128), 256, 128)
        .unwrap();
    assert!(ready.is_some());
    assert_eq!(bridge.pump_texture_job().unwrap(), None);
}

#[test]
fn chunked_load_many_fetches_one_notification() {
    let (mem, refs) = memory_with(&["hero.png"]);
    let mut bridge = test_bridge();
    bridge.attach_memory(mem);
    let [p, l] = refs[0];
    bridge
        .call_import(ImportId::CreateAndLoadTexture, &[p, l, 33071.0, 9729.0])
        .unwrap();
    bridge.take_effects();

    bridge
        .texture_metadata_loaded(
            0,
            TextureMetadata {
                width: 512,
                height: 300,
                chunk_size: 1024,
            },
        )
        .unwrap();
    let fetches: Vec<_> = bridge
        .take_effects()
        .into_iter()
        .filter_map(|e| match e {
            HostEffect::FetchImage(req) => Some(req),
            _ => None,
        })
        .collect();
    assert_eq!(fetches.len(), (512 * 300usize).div_ceil(1024));
    assert_eq!(fetches[3].url, "/webgl_png_chunk?path=hero.png&index=3");

    // Drive it through the frame driver: one job per frame.
    let guest = RecordingGuest::default();
    let mut driver = FrameDriver::new();
    driver.begin_loading();
    driver.start(&guest).unwrap();

    for req in &fetches {
        bridge
            .texture_image_loaded(0, req.chunk, TestImage::new(512, 2), 512, 2)
            .unwrap();
    }
    let mut notified = 0;
    for _ in 0..fetches.len() {
        if bridge.pump_texture_job().unwrap().is_some() {
            notified += 1;
        }
    }
    assert_eq!(notified, 1);

    let mut host = RecordingHost::new(1280, 720, 0.0);
    let report = driver.tick(&mut host, &guest, 0.0).unwrap();
    assert_eq!(report.texture_ready, None);
}

#[test]
fn overlays_from_guest_frame() {
    let (mem, refs) = memory_with(&["Yorstory", "#ffffff", "HelveticaNeueLTPro-Bd", "dQw4w9WgXcQ"]);
    let mut bridge = test_bridge();
    bridge.attach_memory(mem);
    let [tp, tl] = refs[0];
    let [cp, cl] = refs[1];
    let [fp, fl] = refs[2];
    let [vp, vl] = refs[3];

    bridge.call_import(ImportId::ClearAllText, &[]).unwrap();
    bridge
        .call_import(
            ImportId::AddTextLine,
            &[tp, tl, 50.0, 100.0, 20.0, -0.5, cp, cl, fp, fl],
        )
        .unwrap();
    bridge
        .call_import(
            ImportId::AddTextBox,
            &[tp, tl, 10.0, 200.0, 320.0, 16.0, 22.0, 0.0, cp, cl, fp, fl, 3.0],
        )
        .unwrap();
    bridge
        .call_import(ImportId::AddYoutubeEmbed, &[0.0, 0.0, 640.0, 360.0, vp, vl])
        .unwrap();

    let surface = bridge.overlays().surface();
    let nodes = text_nodes(surface.ops());
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].top, 80.0);
    assert_eq!(nodes[1].top, 184.0);
    assert_eq!(nodes[1].width, Some(320.0));
    assert_eq!(surface.live_count("_wasmText"), 2);
    assert_eq!(surface.live_count("_wasmEmbed"), 1);

    bridge.call_import(ImportId::ClearAllText, &[]).unwrap();
    assert_eq!(bridge.overlays().surface().live_count("_wasmText"), 0);
    assert_eq!(bridge.overlays().surface().live_count("_wasmEmbed"), 1);
}

#[test]
fn gl_pipeline_setup() {
    let (mem, refs) = memory_with(&["attribute vec2 p;", "void main(){}", "a_position", "u_mvp"]);
    let mut bridge = test_bridge();
    bridge.attach_memory(mem);
    let [vp, vl] = refs[0];
    let [fp, fl] = refs[1];
    let [ap, al] = refs[2];
    let [up, ul] = refs[3];

    let vs = bridge
        .call_import(ImportId::CompileShader, &[vp, vl, 35633.0])
        .unwrap()
        .unwrap();
    let fs = bridge
        .call_import(ImportId::CompileShader, &[fp, fl, 35632.0])
        .unwrap()
        .unwrap();
    let program = bridge
        .call_import(ImportId::LinkShaderProgram, &[vs, fs])
        .unwrap()
        .unwrap();
    bridge.call_import(ImportId::GlUseProgram, &[program]).unwrap();

    let attrib = bridge
        .call_import(ImportId::GlGetAttribLocation, &[program, ap, al])
        .unwrap();
    assert_eq!(attrib, Some(10.0));
    let mvp = bridge
        .call_import(ImportId::GlGetUniformLocation, &[program, up, ul])
        .unwrap()
        .unwrap();

    let buffer = bridge
        .call_import(ImportId::GlCreateBuffer, &[])
        .unwrap()
        .unwrap();
    bridge
        .call_import(ImportId::GlBindBuffer, &[34962.0, buffer])
        .unwrap();

    // Identity matrix at an aligned address past the strings.
    let mat: Vec<u8> = (0..16)
        .map(|i| if i % 5 == 0 { 1.0f32 } else { 0.0 })
        .flat_map(f32::to_le_bytes)
        .collect();
    bridge.memory().unwrap().write_bytes(1024, &mat).unwrap();
    bridge
        .call_import(ImportId::GlUniformMatrix4fv, &[mvp, 0.0, 1024.0])
        .unwrap();

    let calls = bridge.forwarder().gl().calls();
    assert!(calls.iter().any(|c| c.starts_with("uniformMatrix4fv(Some(u_mvp), false, [1.0, 0.0")));

    // Misaligned float views are rejected, not read.
    assert!(matches!(
        bridge.call_import(ImportId::GlUniformMatrix4fv, &[mvp, 0.0, 1026.0]),
        Err(BridgeError::Memory(_))
    ));
}

#[test]
fn input_is_forwarded_only_while_running() {
    let guest = RecordingGuest::default();
    let mut driver = FrameDriver::new();
    let click = InputEvent::MouseDown {
        button: 0,
        x: 10.0,
        y: 700.0,
    };
    assert!(!driver.dispatch_input(Some(&guest), click).unwrap());
    driver.begin_loading();
    driver.start(&guest).unwrap();
    assert!(driver.dispatch_input(Some(&guest), click).unwrap());
    assert_eq!(guest.calls().last().unwrap(), "onMouseDown(0, 10, 700)");
}
