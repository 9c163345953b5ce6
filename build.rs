fn main() {
    // ESP-IDF toolchain environment is only needed for the firmware binary.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
