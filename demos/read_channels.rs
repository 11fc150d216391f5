//! Print all eight channels of an ADC Pi on `/dev/i2c-1` twice a second.

#[cfg(target_os = "linux")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use adcpi::config::{Address, Gain, SampleRate};
    use adcpi::DualAdc;
    use linux_embedded_hal::I2cdev;

    let a = I2cdev::new("/dev/i2c-1")?;
    let b = I2cdev::new("/dev/i2c-1")?;
    let mut adc = DualAdc::new(a, Address::A68, b, Address::A69);
    adc.set_sample_rate(SampleRate::Bits16);
    adc.set_gain(Gain::X1);

    loop {
        for channel in 1..=8 {
            let reading = adc.read_voltage(channel)?;
            println!("ch{channel}: {:.4} V ({})", reading.volts, reading.raw);
        }
        println!();
        std::thread::sleep(std::time::Duration::from_millis(500));
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("read_channels needs Linux i2c-dev");
}
