//! Minimal wgpu init (no window). Verifies lucerna-renderer and wgpu work.

fn main() {
    env_logger::init();
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .expect("No adapter");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .expect("No device");
        let renderer =
            lucerna_renderer::Renderer::new(device, queue, lucerna_renderer::LucernaConfig::default())
                .expect("Renderer::new");
        println!(
            "Lucerna minimal_wgpu: OK ({} probes)",
            renderer.grid().count()
        );
    });
}
