#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use el_messages::{DutyScaler, EncoderScale, PWM_PERIOD, SessionConfig};
use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::{
    clock::CpuClock,
    mcpwm::{McPwm, PeripheralClockConfig, operator::PwmPinConfig, timer::PwmWorkingMode},
    pcnt::Pcnt,
    timer::timg::TimerGroup,
    uart::Uart,
};
use esp_println::println;
use log::{error, info};
use mc_esp32::{
    acquisition::{Rig, run_session},
    gpio::{
        encoder::QuadratureEncoder,
        interrupt_handler,
        pwm::{Actuator, FREQUENCY, PERIOD, PERIPHERAL_CLOCK_PRESCALER},
    },
    uart::{self, COMMAND_CHANNEL, receive_commands},
};

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "main is the only place you should be allowed to allocate large buffers."
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);
    println!("Embassy initialized!");

    // UART0 is wired to the USB-serial bridge of the devkit.
    let serial = Uart::new(peripherals.UART0, uart::config())
        .expect("Failed to configure UART0")
        .with_rx(peripherals.GPIO3)
        .with_tx(peripherals.GPIO1)
        .into_async();
    let (rx, tx) = serial.split();

    // Encoder phases A and B on IO16 and IO17.
    let mut pcnt = Pcnt::new(peripherals.PCNT);
    pcnt.set_interrupt_handler(interrupt_handler);
    let encoder = QuadratureEncoder::new(pcnt.unit0, peripherals.GPIO16, peripherals.GPIO17);

    // initialize PWM
    let clock_cfg = PeripheralClockConfig::with_prescaler(PERIPHERAL_CLOCK_PRESCALER);
    let mut mcpwm = McPwm::new(peripherals.MCPWM0, clock_cfg);
    // connect operator0 to timer0
    mcpwm.operator0.set_timer(&mcpwm.timer0);
    // connect operator0 to the MOSFET gate on pin IO15
    let pwm_pin = mcpwm
        .operator0
        .with_pin_a(peripherals.GPIO15, PwmPinConfig::UP_ACTIVE_HIGH);
    // start timer with timestamp values in the range that we choose.
    let timer_clock_cfg = clock_cfg
        .timer_clock_with_frequency(PERIOD, PwmWorkingMode::Increase, FREQUENCY)
        .expect("Failed to create TimerClockConfig");
    mcpwm.timer0.start(timer_clock_cfg);
    let actuator = Actuator::new(pwm_pin, DutyScaler::new(PWM_PERIOD));

    // Setup communication between tasks
    let command_channel = COMMAND_CHANNEL.take();
    let to_sampler = command_channel.sender();
    let from_receiver = command_channel.receiver();
    spawner.must_spawn(receive_commands(rx, to_sampler));

    let mut rig = Rig {
        encoder,
        actuator,
        tx,
        scale: EncoderScale::RIG,
    };

    // Run experiments back to back, each one waiting for the host's start command.
    loop {
        match run_session(&mut rig, &from_receiver, SessionConfig::default()).await {
            Ok(summary) => info!(
                "Run ended ({:?}) after {} samples",
                summary.reason, summary.samples
            ),
            Err(err) => error!("Run aborted: {err:?}"),
        }
    }
}
